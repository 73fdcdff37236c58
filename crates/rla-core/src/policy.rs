//! Sample-size policy seam.
//!
//! The statistical machinery that decides how many ballots a risk limit
//! requires, and the seeded pseudo-random sequence the draws come from,
//! both live outside this crate. The coordinator consumes them through
//! this trait.

use crate::dashboard::CountyDashboard;
use async_trait::async_trait;
use rla_types::CountyId;
use thiserror::Error;

/// Errors that can occur while consulting the sample policy.
#[derive(Debug, Error)]
pub enum PolicyError {
	/// The published random sequence does not carry enough draws.
	#[error("requested draws {start}..{end} but only {available} are published")]
	InsufficientDraws {
		start: usize,
		end: usize,
		available: usize,
	},
	/// The sample-size estimator failed.
	#[error("Estimation error: {0}")]
	Estimation(String),
}

/// External source of sample-size estimates and random draw numbers.
#[async_trait]
pub trait SamplePolicy: Send + Sync {
	/// Total samples the county is estimated to need, assuming the
	/// discrepancy rate observed so far continues.
	async fn estimated_samples_to_audit(
		&self,
		dashboard: &CountyDashboard,
	) -> Result<u64, PolicyError>;

	/// Total samples the county needs if no further discrepancies occur.
	/// Zero means the risk limit is already satisfied.
	async fn optimistic_samples_to_audit(
		&self,
		dashboard: &CountyDashboard,
	) -> Result<u64, PolicyError>;

	/// The next `count` draw numbers for the county, starting at
	/// `start_index` into its published random sequence.
	async fn draws(
		&self,
		county_id: CountyId,
		start_index: usize,
		count: u64,
	) -> Result<Vec<u64>, PolicyError>;
}

/// A fixed policy serving a pre-published draw sequence and constant
/// estimates. Used by tests and the development service.
pub struct StaticSamplePolicy {
	pub sequence: Vec<u64>,
	pub estimated: u64,
	pub optimistic: u64,
}

#[async_trait]
impl SamplePolicy for StaticSamplePolicy {
	async fn estimated_samples_to_audit(
		&self,
		_dashboard: &CountyDashboard,
	) -> Result<u64, PolicyError> {
		Ok(self.estimated)
	}

	async fn optimistic_samples_to_audit(
		&self,
		_dashboard: &CountyDashboard,
	) -> Result<u64, PolicyError> {
		Ok(self.optimistic)
	}

	async fn draws(
		&self,
		_county_id: CountyId,
		start_index: usize,
		count: u64,
	) -> Result<Vec<u64>, PolicyError> {
		let end = start_index + count as usize;
		if end > self.sequence.len() {
			return Err(PolicyError::InsufficientDraws {
				start: start_index,
				end,
				available: self.sequence.len(),
			});
		}
		Ok(self.sequence[start_index..end].to_vec())
	}
}
