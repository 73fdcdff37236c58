//! Core orchestration for the RLA coordinator.
//!
//! This crate holds the audit progress ledger kept per county, the
//! sample-size policy seam, and the workflow coordinator that turns
//! planner and ledger outcomes into state-machine events across the
//! state administrator, the counties, and their audit boards.

/// Workflow coordinator driving engine events from audit outcomes.
pub mod coordinator;
/// Audit progress ledger, one per county.
pub mod dashboard;
/// Sample-size policy seam.
pub mod policy;

pub use coordinator::{CoordinatorError, RoundOneOutcome, RoundSize, WorkflowCoordinator};
pub use dashboard::{
	AuditReport, CountyDashboard, CvrAuditInfo, DashboardError, MIN_AUDIT_BOARD_MEMBERS,
	MIN_ROUND_SIGN_OFF_MEMBERS,
};
pub use policy::{PolicyError, SamplePolicy, StaticSamplePolicy};
