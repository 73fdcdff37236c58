//! Reference audit workflow.
//!
//! A composite machine tracking a whole audit's canonical milestones, from
//! tool initialization through the published results. It abstracts over
//! the per-actor workflows: one `Advance` per milestone, plus the two
//! deadline failures that strand a county before its audit can start.

use crate::engine::{Machine, WorkflowDefinition};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Milestones of the reference workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceState {
	ToolInitial,
	DosInitial,
	DosAuditOngoing,
	CountyInitial,
	ManifestTooLate,
	CvrsTooLate,
	CountyAuditUnderway,
	AuditInitial,
	ReportSubmitted,
	CountyAuditComplete,
	DosAuditComplete,
	ResultsPublished,
}

/// Events of the reference workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceEvent {
	Advance,
	MissManifestDeadline,
	MissCvrsDeadline,
}

static DEFINITION: Lazy<WorkflowDefinition<ReferenceState, ReferenceEvent>> = Lazy::new(|| {
	use ReferenceEvent::*;
	use ReferenceState::*;
	WorkflowDefinition::new(
		"reference-audit",
		ToolInitial,
		&[ResultsPublished, ManifestTooLate, CvrsTooLate],
		vec![
			(ToolInitial, Advance, DosInitial),
			(DosInitial, Advance, DosAuditOngoing),
			(DosAuditOngoing, Advance, CountyInitial),
			(CountyInitial, Advance, CountyAuditUnderway),
			(CountyInitial, MissManifestDeadline, ManifestTooLate),
			(CountyInitial, MissCvrsDeadline, CvrsTooLate),
			(CountyAuditUnderway, Advance, AuditInitial),
			(AuditInitial, Advance, ReportSubmitted),
			(ReportSubmitted, Advance, CountyAuditComplete),
			(CountyAuditComplete, Advance, DosAuditComplete),
			(DosAuditComplete, Advance, ResultsPublished),
		],
	)
});

/// A reference machine instance.
pub type ReferenceMachine = Machine<ReferenceState, ReferenceEvent>;

/// The workflow definition, shared process-wide.
pub fn definition() -> &'static WorkflowDefinition<ReferenceState, ReferenceEvent> {
	&DEFINITION
}

/// A fresh machine in the initial state.
pub fn machine() -> ReferenceMachine {
	Machine::new(definition())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn advancing_walks_every_milestone() {
		let mut m = machine();
		let expected = [
			ReferenceState::DosInitial,
			ReferenceState::DosAuditOngoing,
			ReferenceState::CountyInitial,
			ReferenceState::CountyAuditUnderway,
			ReferenceState::AuditInitial,
			ReferenceState::ReportSubmitted,
			ReferenceState::CountyAuditComplete,
			ReferenceState::DosAuditComplete,
			ReferenceState::ResultsPublished,
		];
		for state in expected {
			assert_eq!(m.step(&ReferenceEvent::Advance).unwrap(), state);
		}
		assert!(m.is_in_final_state());
	}

	#[test]
	fn missed_deadlines_strand_the_county() {
		let mut m = Machine::with_state(definition(), ReferenceState::CountyInitial);
		m.step(&ReferenceEvent::MissManifestDeadline).unwrap();
		assert_eq!(m.current_state(), ReferenceState::ManifestTooLate);
		assert!(m.is_in_final_state());
		assert!(m.step(&ReferenceEvent::Advance).is_err());
	}
}
