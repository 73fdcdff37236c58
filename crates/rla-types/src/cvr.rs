//! Cast-vote record types.
//!
//! A cast-vote record (CVR) is the system-of-record interpretation of one
//! physical ballot. An audited CVR (ACVR) is the audit board's
//! re-interpretation of the same ballot, entered during a round. When a
//! random draw resolves to a ballot location that has no CVR, a phantom
//! record is substituted so the position still participates in discrepancy
//! computation.

use crate::{CountyId, CvrId};
use serde::{Deserialize, Serialize};

/// The reserved identifier carried by every phantom record.
pub const PHANTOM_RECORD_ID: CvrId = 0;

/// The ballot type marker carried by every phantom record.
pub const PHANTOM_BALLOT_TYPE: &str = "PHANTOM RECORD";

/// The provenance of a cast-vote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
	/// Imported from a county's CVR export.
	Uploaded,
	/// Entered by an audit board during a round.
	AuditorEntered,
	/// Sentinel substituted for a ballot with no CVR at its resolved
	/// location. Always yields a discrepancy when compared against audit
	/// board input.
	PhantomRecord,
}

/// Whether the audit board reached consensus on a contest's markings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusValue {
	Yes,
	No,
}

/// The markings recorded for a single contest on a single ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvrContestInfo {
	/// The contest these markings belong to.
	pub contest: String,
	/// Audit board consensus; `None` for uploaded records.
	pub consensus: Option<ConsensusValue>,
	/// The choices marked on the ballot for this contest.
	pub choices: Vec<String>,
}

/// The interpretation of one physical ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVoteRecord {
	/// Database identifier. `PHANTOM_RECORD_ID` for phantom records.
	pub id: CvrId,
	/// The provenance of this record.
	pub record_type: RecordType,
	/// The county that cast this ballot.
	pub county_id: CountyId,
	/// The sequential number of this record in the county's CVR export;
	/// equal to the random draw number that selects it.
	pub cvr_number: u64,
	/// The scanner that imaged the ballot.
	pub scanner_id: u32,
	/// The batch the ballot was scanned in.
	pub batch_id: String,
	/// The position of the ballot within its batch, 1-based.
	pub record_id: u64,
	/// The identifier imprinted on the physical ballot.
	pub imprinted_id: String,
	/// The ballot style.
	pub ballot_type: String,
	/// Per-contest markings.
	pub contest_info: Vec<CvrContestInfo>,
	/// Whether this record has been audited.
	pub audit_flag: bool,
}

impl CastVoteRecord {
	/// The sentinel record substituted when no CVR exists at a resolved
	/// ballot location.
	pub fn phantom_record() -> Self {
		Self {
			id: PHANTOM_RECORD_ID,
			record_type: RecordType::PhantomRecord,
			county_id: 0,
			cvr_number: 0,
			scanner_id: 0,
			batch_id: String::new(),
			record_id: 0,
			imprinted_id: String::new(),
			ballot_type: PHANTOM_BALLOT_TYPE.to_string(),
			contest_info: Vec::new(),
			audit_flag: false,
		}
	}

	/// Whether this record is a phantom.
	pub fn is_phantom(&self) -> bool {
		self.record_type == RecordType::PhantomRecord
	}

	/// The choices marked for the named contest, if the ballot carries it.
	pub fn choices_for(&self, contest: &str) -> Option<&[String]> {
		self.contest_info
			.iter()
			.find(|ci| ci.contest == contest)
			.map(|ci| ci.choices.as_slice())
	}
}
