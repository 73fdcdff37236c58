//! Ballot selection for the RLA coordinator.
//!
//! This crate maps random draw numbers to physical ballots and plans
//! audit rounds: manifest range resolution with phantom substitution,
//! round definition with canonical pull ordering, deduplication and
//! exclusion of prior rounds' ballots, and the pure sequence helpers
//! those operations are built from.

/// Canonical pull order and pure sequence helpers.
pub mod order;
/// Ballot resolver and round planner.
pub mod planner;

pub use planner::{ResolvedDraw, RoundPlan, RoundPlanner, SelectionError};
