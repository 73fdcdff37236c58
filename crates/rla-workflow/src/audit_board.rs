//! Audit board workflow.
//!
//! The board that physically audits a county's ballots. Most of its life
//! is spent in progress, recording markings and reports; it leaves that
//! state only by submitting its final report, or when the coordinator
//! ends the audit for it (nothing to audit, risk limit already met, a
//! missed upload deadline, or a statewide abort).

use crate::engine::{Machine, WorkflowDefinition};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// States of the audit board workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditBoardState {
	Initial,
	InProgress,
	IntermediateReportSubmitted,
	ReportSubmitted,
	AuditComplete,
	UnableToAudit,
	AuditAborted,
}

/// Events of the audit board workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditBoardEvent {
	Advance,
	ReportMarkings,
	ReportBallotNotFound,
	SubmitInvestigationReport,
	SubmitIntermediateReport,
	SubmitFinalReport,
	Refresh,
	RoundStart,
	NoContestsToAudit,
	RiskLimitAchieved,
	DeadlineMissed,
	AbortAudit,
}

static DEFINITION: Lazy<WorkflowDefinition<AuditBoardState, AuditBoardEvent>> = Lazy::new(|| {
	use AuditBoardEvent::*;
	use AuditBoardState::*;
	WorkflowDefinition::new(
		"audit-board",
		Initial,
		&[ReportSubmitted, AuditComplete, UnableToAudit, AuditAborted],
		vec![
			(Initial, Advance, InProgress),
			(Initial, RoundStart, InProgress),
			// Coordinator outcomes that end the audit before it starts.
			(Initial, NoContestsToAudit, AuditComplete),
			(Initial, RiskLimitAchieved, AuditComplete),
			(Initial, DeadlineMissed, UnableToAudit),
			(InProgress, ReportMarkings, InProgress),
			(InProgress, ReportBallotNotFound, InProgress),
			(InProgress, SubmitInvestigationReport, InProgress),
			(InProgress, Refresh, InProgress),
			(InProgress, RoundStart, InProgress),
			(InProgress, SubmitIntermediateReport, IntermediateReportSubmitted),
			(IntermediateReportSubmitted, Advance, InProgress),
			(InProgress, SubmitFinalReport, ReportSubmitted),
			(InProgress, AbortAudit, AuditAborted),
		],
	)
});

/// An audit board machine instance.
pub type AuditBoardMachine = Machine<AuditBoardState, AuditBoardEvent>;

/// The workflow definition, shared process-wide.
pub fn definition() -> &'static WorkflowDefinition<AuditBoardState, AuditBoardEvent> {
	&DEFINITION
}

/// A fresh machine in the initial state.
pub fn machine() -> AuditBoardMachine {
	Machine::new(definition())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn marking_reports_keep_the_board_in_progress() {
		let mut m = machine();
		m.step(&AuditBoardEvent::RoundStart).unwrap();
		for event in [
			AuditBoardEvent::ReportMarkings,
			AuditBoardEvent::ReportBallotNotFound,
			AuditBoardEvent::SubmitInvestigationReport,
			AuditBoardEvent::Refresh,
			AuditBoardEvent::RoundStart,
		] {
			assert_eq!(m.step(&event).unwrap(), AuditBoardState::InProgress);
		}
	}

	#[test]
	fn intermediate_report_pauses_then_resumes() {
		let mut m = Machine::with_state(definition(), AuditBoardState::InProgress);
		m.step(&AuditBoardEvent::SubmitIntermediateReport).unwrap();
		assert_eq!(
			m.current_state(),
			AuditBoardState::IntermediateReportSubmitted
		);
		m.step(&AuditBoardEvent::Advance).unwrap();
		assert_eq!(m.current_state(), AuditBoardState::InProgress);
	}

	#[test]
	fn final_report_finishes_the_board() {
		let mut m = Machine::with_state(definition(), AuditBoardState::InProgress);
		m.step(&AuditBoardEvent::SubmitFinalReport).unwrap();
		assert_eq!(m.current_state(), AuditBoardState::ReportSubmitted);
		assert!(m.is_in_final_state());
	}

	#[test]
	fn coordinator_can_end_an_unstarted_audit() {
		let mut m = machine();
		m.step(&AuditBoardEvent::RiskLimitAchieved).unwrap();
		assert_eq!(m.current_state(), AuditBoardState::AuditComplete);
		assert!(m.is_in_final_state());

		let mut m = machine();
		m.step(&AuditBoardEvent::DeadlineMissed).unwrap();
		assert_eq!(m.current_state(), AuditBoardState::UnableToAudit);
		assert!(m.is_in_final_state());
	}

	#[test]
	fn abort_is_only_legal_in_progress() {
		let mut m = machine();
		assert!(m.step(&AuditBoardEvent::AbortAudit).is_err());
		m.step(&AuditBoardEvent::RoundStart).unwrap();
		m.step(&AuditBoardEvent::AbortAudit).unwrap();
		assert_eq!(m.current_state(), AuditBoardState::AuditAborted);
	}
}
