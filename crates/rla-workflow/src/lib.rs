//! Workflow state machines for the audit coordinator.
//!
//! This crate provides a generic table-driven state-machine engine and the
//! four concrete workflows built on it:
//!
//! - `dos`: the state administrator's audit workflow
//! - `county`: a county's upload-and-audit workflow
//! - `audit_board`: the board that physically audits ballots
//! - `reference`: the composite milestone workflow for a whole audit
//!
//! All tables are deterministic: each (state, event) pair maps to at most
//! one target state, and an event with no table entry is rejected without
//! mutating the machine.

pub mod audit_board;
pub mod county;
pub mod dos;
pub mod engine;
pub mod reference;

pub use audit_board::{AuditBoardEvent, AuditBoardMachine, AuditBoardState};
pub use county::{CountyEvent, CountyMachine, CountyState, HashOutcome, ParseOutcome, UploadOutcome};
pub use dos::{DosEvent, DosMachine, DosState};
pub use engine::{Machine, WorkflowDefinition, WorkflowError};
pub use reference::{ReferenceEvent, ReferenceMachine, ReferenceState};
