//! Ballot-manifest entries.
//!
//! A ballot manifest describes where a county's physical ballots are
//! stored. Each entry covers a contiguous run of ballots for one
//! (county, scanner, batch) and maps any sequence number in its range to an
//! imprinted identifier and an intra-batch position.

use crate::CountyId;
use serde::{Deserialize, Serialize};

/// A contiguous run of physical ballots for one (county, scanner, batch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotManifestEntry {
	/// The county this entry belongs to.
	pub county_id: CountyId,
	/// The scanner that imaged the batch.
	pub scanner_id: u32,
	/// The batch identifier.
	pub batch_id: String,
	/// The number of ballots in the batch.
	pub batch_size: u64,
	/// Where the batch is physically stored.
	pub storage_location: String,
	/// First sequence number covered by this entry, inclusive.
	pub sequence_start: u64,
	/// Last sequence number covered by this entry, inclusive.
	pub sequence_end: u64,
}

impl BallotManifestEntry {
	/// Whether the given sequence number falls in this entry's range.
	pub fn covers(&self, sequence_number: u64) -> bool {
		self.sequence_start <= sequence_number && sequence_number <= self.sequence_end
	}

	/// The 1-based position within the batch of the ballot holding the
	/// given sequence number. Callers must check `covers` first.
	pub fn ballot_position(&self, sequence_number: u64) -> u64 {
		sequence_number - self.sequence_start + 1
	}

	/// The identifier imprinted on the ballot holding the given sequence
	/// number: scanner, batch, and position joined by dashes.
	pub fn imprinted_id(&self, sequence_number: u64) -> String {
		format!(
			"{}-{}-{}",
			self.scanner_id,
			self.batch_id,
			self.ballot_position(sequence_number)
		)
	}
}
