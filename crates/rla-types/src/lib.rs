//! Common types module for the RLA coordinator.
//!
//! This module defines the core data types shared by every crate in the
//! workspace: counties, cast-vote records, ballot manifests, comparison
//! audits, and audit rounds. It provides a centralized location for shared
//! types to ensure consistency across all components.

/// Comparison-audit types: audit reasons and discrepancy computation.
pub mod audit;
/// Cast-vote record types, including phantom records.
pub mod cvr;
/// Ballot-manifest entries describing physical ballot storage.
pub mod manifest;
/// Audit round bookkeeping.
pub mod round;

// Re-export all types for convenient access
pub use audit::*;
pub use cvr::*;
pub use manifest::*;
pub use round::*;

/// Identifier of a county, as assigned by the state.
pub type CountyId = u64;

/// Database identifier of a cast-vote record.
pub type CvrId = u64;
