//! Comparison-audit types.
//!
//! Each contest under audit carries an audit reason, which keys the
//! per-reason discrepancy and disagreement counters on the county ledger
//! and on each round. Discrepancy computation here only decides *whether*
//! an adjudication is discrepant; the statistical weight a discrepancy
//! carries toward the risk limit is computed elsewhere.

use crate::cvr::CastVoteRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The contest-specific justification for auditing a contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditReason {
	StateWideContest,
	CountyWideContest,
	CloseContest,
	GeographicalScope,
	ConcernRegardingAccuracy,
	OpportunisticBenefits,
}

impl fmt::Display for AuditReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			AuditReason::StateWideContest => "state_wide_contest",
			AuditReason::CountyWideContest => "county_wide_contest",
			AuditReason::CloseContest => "close_contest",
			AuditReason::GeographicalScope => "geographical_scope",
			AuditReason::ConcernRegardingAccuracy => "concern_regarding_accuracy",
			AuditReason::OpportunisticBenefits => "opportunistic_benefits",
		};
		write!(f, "{}", name)
	}
}

/// One contest-level comparison audit active on a county.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonAudit {
	/// The contest under audit.
	pub contest: String,
	/// Why the contest is being audited.
	pub audit_reason: AuditReason,
}

impl ComparisonAudit {
	/// Compares an original CVR against the audit board's ACVR for this
	/// audit's contest. Returns `None` when the records agree, or the
	/// discrepancy magnitude when they do not: 2 when either record is a
	/// phantom (the worst case), 1 for differing or missing markings.
	pub fn compute_discrepancy(&self, cvr: &CastVoteRecord, acvr: &CastVoteRecord) -> Option<i8> {
		if cvr.is_phantom() || acvr.is_phantom() {
			return Some(2);
		}
		match (cvr.choices_for(&self.contest), acvr.choices_for(&self.contest)) {
			(Some(original), Some(audited)) if original == audited => None,
			(None, None) => None,
			_ => Some(1),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cvr::CvrContestInfo;

	fn cvr_with(contest: &str, choices: &[&str]) -> CastVoteRecord {
		let mut cvr = CastVoteRecord::phantom_record();
		cvr.record_type = crate::cvr::RecordType::Uploaded;
		cvr.id = 1;
		cvr.contest_info = vec![CvrContestInfo {
			contest: contest.into(),
			consensus: None,
			choices: choices.iter().map(|c| c.to_string()).collect(),
		}];
		cvr
	}

	fn audit() -> ComparisonAudit {
		ComparisonAudit {
			contest: "Governor".into(),
			audit_reason: AuditReason::StateWideContest,
		}
	}

	#[test]
	fn matching_markings_are_not_discrepant() {
		let cvr = cvr_with("Governor", &["Alice"]);
		let acvr = cvr_with("Governor", &["Alice"]);
		assert_eq!(audit().compute_discrepancy(&cvr, &acvr), None);
	}

	#[test]
	fn differing_markings_are_discrepant() {
		let cvr = cvr_with("Governor", &["Alice"]);
		let acvr = cvr_with("Governor", &["Bob"]);
		assert_eq!(audit().compute_discrepancy(&cvr, &acvr), Some(1));
	}

	#[test]
	fn missing_contest_on_acvr_is_discrepant() {
		let cvr = cvr_with("Governor", &["Alice"]);
		let acvr = cvr_with("Senate", &["Carol"]);
		assert_eq!(audit().compute_discrepancy(&cvr, &acvr), Some(1));
	}

	#[test]
	fn phantom_is_always_the_worst_discrepancy() {
		let cvr = CastVoteRecord::phantom_record();
		let acvr = cvr_with("Governor", &["Alice"]);
		assert_eq!(audit().compute_discrepancy(&cvr, &acvr), Some(2));
		assert_eq!(audit().compute_discrepancy(&acvr, &cvr), Some(2));
	}
}
