//! Audit round bookkeeping.
//!
//! A round is one bounded batch of ballots a county must adjudicate before
//! the next batch is drawn. Counter mutations on a round are driven by the
//! county ledger, which mirrors its own county-wide counters onto the
//! currently open round.

use crate::audit::AuditReason;
use crate::CvrId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A member of an audit board, identified for round sign-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elector {
	pub first_name: String,
	pub last_name: String,
	pub political_party: String,
}

/// One round of a county's audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
	/// 1-based round index.
	pub number: u32,
	/// When the round started.
	pub start_time: DateTime<Utc>,
	/// When the round ended; `None` while the round is open.
	pub end_time: Option<DateTime<Utc>>,
	/// The number of ballots this round must cover.
	pub expected_count: u64,
	/// The number of ballots attributed to this round so far.
	pub actual_count: u64,
	/// Snapshot of the county-wide ballots-audited counter at round start.
	pub previous_ballots_audited: u64,
	/// The county's audited-prefix length when the round started.
	pub start_audited_prefix_length: usize,
	/// The county's audited-prefix length as of the latest update.
	pub actual_audited_prefix_length: usize,
	/// Discrepancies attributed to this round, by audit reason.
	pub discrepancies: HashMap<AuditReason, u64>,
	/// Disagreements attributed to this round, by audit reason.
	pub disagreements: HashMap<AuditReason, u64>,
	/// Sign-off signatories; set when the round is ended.
	pub signatories: Vec<Elector>,
	/// The sorted, deduplicated, exclusion-filtered ballots for this
	/// round, in canonical pull order.
	pub ballot_sequence: Vec<CvrId>,
	/// The raw resolved draws for this round, in draw order with
	/// duplicates preserved.
	pub audit_subsequence: Vec<CvrId>,
}

impl Round {
	/// Starts a new round.
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		number: u32,
		start_time: DateTime<Utc>,
		expected_count: u64,
		previous_ballots_audited: u64,
		start_audited_prefix_length: usize,
		ballot_sequence: Vec<CvrId>,
		audit_subsequence: Vec<CvrId>,
	) -> Self {
		Self {
			number,
			start_time,
			end_time: None,
			expected_count,
			actual_count: 0,
			previous_ballots_audited,
			start_audited_prefix_length,
			actual_audited_prefix_length: start_audited_prefix_length,
			discrepancies: HashMap::new(),
			disagreements: HashMap::new(),
			signatories: Vec::new(),
			ballot_sequence,
			audit_subsequence,
		}
	}

	/// Whether this round has been ended.
	pub fn is_ended(&self) -> bool {
		self.end_time.is_some()
	}

	/// Attributes one audited ballot to this round.
	pub fn add_audited_ballot(&mut self) {
		self.actual_count += 1;
	}

	/// Reverses one audited-ballot attribution, for re-audits.
	pub fn remove_audited_ballot(&mut self) {
		self.actual_count = self.actual_count.saturating_sub(1);
	}

	/// Attributes a discrepancy for the given reason to this round.
	pub fn add_discrepancy(&mut self, reason: AuditReason) {
		*self.discrepancies.entry(reason).or_insert(0) += 1;
	}

	/// Reverses a discrepancy attribution for the given reason.
	pub fn remove_discrepancy(&mut self, reason: AuditReason) {
		let counter = self.discrepancies.entry(reason).or_insert(0);
		*counter = counter.saturating_sub(1);
	}

	/// Attributes a disagreement for the given reason to this round.
	pub fn add_disagreement(&mut self, reason: AuditReason) {
		*self.disagreements.entry(reason).or_insert(0) += 1;
	}

	/// Reverses a disagreement attribution for the given reason.
	pub fn remove_disagreement(&mut self, reason: AuditReason) {
		let counter = self.disagreements.entry(reason).or_insert(0);
		*counter = counter.saturating_sub(1);
	}
}
