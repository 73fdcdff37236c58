//! State administrator (Department of State) workflow.
//!
//! The statewide actor walks a mostly linear chain: authenticate, set the
//! risk limit, select contests, publish the audit data, seed, and ballot
//! order, then supervise the ongoing audit until every county is done and
//! the final report is published.

use crate::engine::{Machine, WorkflowDefinition};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// States of the state administrator workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DosState {
	Initial,
	Authenticated,
	RiskLimitsSet,
	ContestsToAuditIdentified,
	DataToAuditPublished,
	RandomSeedPublished,
	BallotOrderDefined,
	AuditReadyToStart,
	AuditOngoing,
	AuditComplete,
	ResultsPublished,
}

/// Events of the state administrator workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DosEvent {
	AuthenticateStateAdministrator,
	EstablishRiskLimit,
	SelectContestsForAudit,
	PublishAuditData,
	PublishSeed,
	PublishBallotsToAudit,
	Advance,
	AuditEvent,
	IndicateFullHandCount,
	CountyAuditComplete,
	PublishAuditReport,
	Refresh,
}

static DEFINITION: Lazy<WorkflowDefinition<DosState, DosEvent>> = Lazy::new(|| {
	use DosEvent::*;
	use DosState::*;
	WorkflowDefinition::new(
		"dos-dashboard",
		Initial,
		&[ResultsPublished],
		vec![
			(Initial, AuthenticateStateAdministrator, Authenticated),
			(Authenticated, EstablishRiskLimit, RiskLimitsSet),
			(RiskLimitsSet, SelectContestsForAudit, ContestsToAuditIdentified),
			(ContestsToAuditIdentified, PublishAuditData, DataToAuditPublished),
			(DataToAuditPublished, PublishSeed, RandomSeedPublished),
			(RandomSeedPublished, PublishBallotsToAudit, BallotOrderDefined),
			(BallotOrderDefined, Advance, AuditReadyToStart),
			(AuditReadyToStart, Advance, AuditOngoing),
			(AuditReadyToStart, IndicateFullHandCount, AuditReadyToStart),
			(AuditOngoing, AuditEvent, AuditOngoing),
			(AuditOngoing, IndicateFullHandCount, AuditOngoing),
			(AuditOngoing, Refresh, AuditOngoing),
			(AuditOngoing, CountyAuditComplete, AuditComplete),
			(AuditComplete, PublishAuditReport, ResultsPublished),
		],
	)
});

/// A state administrator machine instance.
pub type DosMachine = Machine<DosState, DosEvent>;

/// The workflow definition, shared process-wide.
pub fn definition() -> &'static WorkflowDefinition<DosState, DosEvent> {
	&DEFINITION
}

/// A fresh machine in the initial state.
pub fn machine() -> DosMachine {
	Machine::new(definition())
}
