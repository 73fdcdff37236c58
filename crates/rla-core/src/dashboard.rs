//! Audit progress ledger, one per county.
//!
//! The dashboard tracks everything a county accumulates during its audit:
//! audit board sign-ins, upload bookkeeping, the cumulative audit
//! sequence (each original CVR paired with the board's adjudication), the
//! per-reason discrepancy and disagreement counters, and the rounds. At
//! most one round is open at a time, and every county-wide counter
//! mutation is mirrored onto the open round by an explicit conditional —
//! that mirroring is what round-close attribution is built on.

use chrono::{DateTime, Utc};
use rla_types::{
	AuditReason, CastVoteRecord, ComparisonAudit, ConsensusValue, CountyId, CvrId, Elector, Round,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// The fewest electors an audit board may sign in with.
pub const MIN_AUDIT_BOARD_MEMBERS: usize = 2;

/// The fewest signatories a round sign-off requires.
pub const MIN_ROUND_SIGN_OFF_MEMBERS: usize = 2;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum DashboardError {
	/// A round was started while another is still open. Hard stop; the
	/// open round is never closed automatically.
	#[error("county {county} already has an open round")]
	RoundAlreadyOpen { county: CountyId },
	/// An operation requiring an open round found none.
	#[error("county {county} has no round in progress")]
	NoCurrentRound { county: CountyId },
	/// An audit board signed in with too few members.
	#[error("audit board requires at least {required} members, got {actual}")]
	AuditBoardTooSmall { required: usize, actual: usize },
	/// A round sign-off carried too few signatories.
	#[error("round sign-off requires at least {required} signatories, got {actual}")]
	NotEnoughSignatories { required: usize, actual: usize },
}

/// One position of the cumulative audit sequence: the original record
/// and, once adjudicated, the audit board's version of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvrAuditInfo {
	pub cvr: CastVoteRecord,
	pub acvr: Option<CastVoteRecord>,
}

/// A free-text report filed by an audit board during a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
	pub submitted_at: DateTime<Utc>,
	pub text: String,
}

/// A county's audit progress ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyDashboard {
	/// The county this ledger belongs to.
	pub id: CountyId,
	/// Every audit board that has signed in, in sign-in order.
	pub audit_boards: Vec<Vec<Elector>>,
	/// Index of the currently signed-in board, if any.
	pub current_audit_board_index: Option<usize>,
	/// When the ballot manifest upload finished.
	pub manifest_uploaded_at: Option<DateTime<Utc>>,
	/// When the CVR export upload finished.
	pub cvrs_uploaded_at: Option<DateTime<Utc>>,
	/// Ballots declared by the manifest.
	pub ballots_in_manifest: u64,
	/// CVRs imported from the export.
	pub cvrs_imported: u64,
	/// The comparison audits active on this county.
	pub comparison_audits: Vec<ComparisonAudit>,
	/// The cumulative audit sequence, in canonical pull order across all
	/// rounds so far.
	pub cvr_audit_info: Vec<CvrAuditInfo>,
	/// County-wide audited-ballot counter.
	pub ballots_audited: u64,
	/// Positions of `cvr_audit_info` adjudicated so far, from the start.
	pub audited_prefix_length: usize,
	/// County-wide discrepancy counters by audit reason.
	pub discrepancies: HashMap<AuditReason, u64>,
	/// County-wide disagreement counters by audit reason.
	pub disagreements: HashMap<AuditReason, u64>,
	/// All rounds, in order; at most the last one is open.
	pub rounds: Vec<Round>,
	/// Index of the open round, if any.
	pub current_round_index: Option<usize>,
	/// Latest estimate of total samples this county must audit.
	pub estimated_samples_to_audit: u64,
	/// Latest optimistic (no further discrepancies) samples count.
	pub optimistic_samples_to_audit: u64,
	/// Investigation reports filed by the audit board.
	pub investigation_reports: Vec<AuditReport>,
	/// Intermediate status reports filed by the audit board.
	pub intermediate_reports: Vec<AuditReport>,
}

impl CountyDashboard {
	/// Creates an empty ledger for the given county.
	pub fn new(id: CountyId) -> Self {
		Self {
			id,
			audit_boards: Vec::new(),
			current_audit_board_index: None,
			manifest_uploaded_at: None,
			cvrs_uploaded_at: None,
			ballots_in_manifest: 0,
			cvrs_imported: 0,
			comparison_audits: Vec::new(),
			cvr_audit_info: Vec::new(),
			ballots_audited: 0,
			audited_prefix_length: 0,
			discrepancies: HashMap::new(),
			disagreements: HashMap::new(),
			rounds: Vec::new(),
			current_round_index: None,
			estimated_samples_to_audit: 0,
			optimistic_samples_to_audit: 0,
			investigation_reports: Vec::new(),
			intermediate_reports: Vec::new(),
		}
	}

	/// Signs in an audit board. The board must carry at least
	/// `MIN_AUDIT_BOARD_MEMBERS` electors.
	pub fn sign_in_audit_board(&mut self, members: Vec<Elector>) -> Result<(), DashboardError> {
		if members.len() < MIN_AUDIT_BOARD_MEMBERS {
			return Err(DashboardError::AuditBoardTooSmall {
				required: MIN_AUDIT_BOARD_MEMBERS,
				actual: members.len(),
			});
		}
		self.audit_boards.push(members);
		self.current_audit_board_index = Some(self.audit_boards.len() - 1);
		Ok(())
	}

	/// Signs out the current audit board.
	pub fn sign_out_audit_board(&mut self) {
		self.current_audit_board_index = None;
	}

	/// Whether an audit board is currently signed in.
	pub fn has_audit_board(&self) -> bool {
		self.current_audit_board_index.is_some()
	}

	/// Files an investigation report.
	pub fn submit_investigation_report(&mut self, report: AuditReport) {
		self.investigation_reports.push(report);
	}

	/// Files an intermediate status report.
	pub fn submit_intermediate_report(&mut self, report: AuditReport) {
		self.intermediate_reports.push(report);
	}

	/// Replaces the cumulative audit sequence, for round one.
	pub fn set_cvrs_to_audit(&mut self, cvrs: Vec<CastVoteRecord>) {
		self.cvr_audit_info = cvrs
			.into_iter()
			.map(|cvr| CvrAuditInfo { cvr, acvr: None })
			.collect();
	}

	/// Appends to the cumulative audit sequence, for subsequent rounds.
	pub fn add_cvrs_to_audit(&mut self, cvrs: Vec<CastVoteRecord>) {
		self.cvr_audit_info
			.extend(cvrs.into_iter().map(|cvr| CvrAuditInfo { cvr, acvr: None }));
	}

	/// The open round, if any.
	pub fn current_round(&self) -> Option<&Round> {
		self.current_round_index.map(|i| &self.rounds[i])
	}

	fn current_round_mut(&mut self) -> Option<&mut Round> {
		self.current_round_index.map(|i| &mut self.rounds[i])
	}

	/// Opens a new round. Fails with `RoundAlreadyOpen` if one is open.
	pub fn start_round(
		&mut self,
		start_time: DateTime<Utc>,
		expected_count: u64,
		ballot_sequence: Vec<CvrId>,
		audit_subsequence: Vec<CvrId>,
	) -> Result<&Round, DashboardError> {
		if self.current_round_index.is_some() {
			return Err(DashboardError::RoundAlreadyOpen { county: self.id });
		}
		let round = Round::new(
			self.rounds.len() as u32 + 1,
			start_time,
			expected_count,
			self.ballots_audited,
			self.audited_prefix_length,
			ballot_sequence,
			audit_subsequence,
		);
		tracing::info!(
			county = self.id,
			round = round.number,
			expected = expected_count,
			"round started"
		);
		self.rounds.push(round);
		self.current_round_index = Some(self.rounds.len() - 1);
		Ok(&self.rounds[self.rounds.len() - 1])
	}

	/// Closes the open round with the signing electors.
	pub fn end_round(
		&mut self,
		end_time: DateTime<Utc>,
		signatories: Vec<Elector>,
	) -> Result<(), DashboardError> {
		if signatories.len() < MIN_ROUND_SIGN_OFF_MEMBERS {
			return Err(DashboardError::NotEnoughSignatories {
				required: MIN_ROUND_SIGN_OFF_MEMBERS,
				actual: signatories.len(),
			});
		}
		let county = self.id;
		let prefix = self.audited_prefix_length;
		let Some(round) = self.current_round_mut() else {
			return Err(DashboardError::NoCurrentRound { county });
		};
		round.end_time = Some(end_time);
		round.signatories = signatories;
		round.actual_audited_prefix_length = prefix;
		tracing::info!(county, round = round.number, "round ended");
		self.current_round_index = None;
		Ok(())
	}

	/// Ballots left in the open round, zero when none is open.
	pub fn ballots_remaining_in_current_round(&self) -> u64 {
		self.current_round()
			.map(|r| r.expected_count.saturating_sub(r.actual_count))
			.unwrap_or(0)
	}

	/// The first unadjudicated record of the cumulative audit sequence.
	pub fn cvr_under_audit(&self) -> Option<&CastVoteRecord> {
		self.cvr_audit_info
			.get(self.audited_prefix_length)
			.map(|info| &info.cvr)
	}

	/// Records the audit board's adjudication for one sequence position
	/// and re-derives the audited prefix length. Positions are
	/// adjudicated strictly in order, so the prefix is the run of
	/// adjudicated entries from the start.
	pub fn record_adjudication(&mut self, position: usize, acvr: CastVoteRecord) {
		if let Some(info) = self.cvr_audit_info.get_mut(position) {
			info.acvr = Some(acvr);
		}
		self.audited_prefix_length = self
			.cvr_audit_info
			.iter()
			.take_while(|info| info.acvr.is_some())
			.count();
	}

	/// Counts one audited ballot, mirrored onto the open round.
	pub fn add_audited_ballot(&mut self) {
		self.ballots_audited += 1;
		if let Some(round) = self.current_round_mut() {
			round.add_audited_ballot();
		}
	}

	/// Reverses one audited-ballot count, for re-audits.
	pub fn remove_audited_ballot(&mut self) {
		self.ballots_audited = self.ballots_audited.saturating_sub(1);
		if let Some(round) = self.current_round_mut() {
			round.remove_audited_ballot();
		}
	}

	/// Counts a discrepancy for the reason, mirrored onto the open round.
	pub fn add_discrepancy(&mut self, reason: AuditReason) {
		*self.discrepancies.entry(reason).or_insert(0) += 1;
		if let Some(round) = self.current_round_mut() {
			round.add_discrepancy(reason);
		}
	}

	/// Reverses a discrepancy count for the reason.
	pub fn remove_discrepancy(&mut self, reason: AuditReason) {
		let counter = self.discrepancies.entry(reason).or_insert(0);
		*counter = counter.saturating_sub(1);
		if let Some(round) = self.current_round_mut() {
			round.remove_discrepancy(reason);
		}
	}

	/// Counts a disagreement for the reason, mirrored onto the open round.
	pub fn add_disagreement(&mut self, reason: AuditReason) {
		*self.disagreements.entry(reason).or_insert(0) += 1;
		if let Some(round) = self.current_round_mut() {
			round.add_disagreement(reason);
		}
	}

	/// Reverses a disagreement count for the reason.
	pub fn remove_disagreement(&mut self, reason: AuditReason) {
		let counter = self.disagreements.entry(reason).or_insert(0);
		*counter = counter.saturating_sub(1);
		if let Some(round) = self.current_round_mut() {
			round.remove_disagreement(reason);
		}
	}

	/// Attributes adjudicated positions to the open round.
	///
	/// Scans from the round's last attributed position (its start prefix
	/// index on the first call) while the index is below the county's
	/// audited prefix length and the round's actual count is below its
	/// expected count, so reconciling twice never re-attributes a
	/// position. Each scanned position contributes at most one
	/// discrepancy flag and one disagreement flag per audit reason, then
	/// advances the round's actual count by one. Positions beyond the
	/// expected-count cap are never attributed to this round.
	pub fn update_round(&mut self) -> Result<(), DashboardError> {
		let Some(index) = self.current_round_index else {
			return Err(DashboardError::NoCurrentRound { county: self.id });
		};
		let prefix = self.audited_prefix_length;
		let audits = &self.comparison_audits;
		let info = &self.cvr_audit_info;
		let round = &mut self.rounds[index];

		let mut position = round
			.start_audited_prefix_length
			.max(round.actual_audited_prefix_length);
		while position < prefix && round.actual_count < round.expected_count {
			let Some(entry) = info.get(position) else {
				break;
			};
			if let Some(acvr) = &entry.acvr {
				let mut discrepancy_reasons: HashSet<AuditReason> = HashSet::new();
				let mut disagreement_reasons: HashSet<AuditReason> = HashSet::new();
				for audit in audits {
					if audit.compute_discrepancy(&entry.cvr, acvr).is_some() {
						discrepancy_reasons.insert(audit.audit_reason);
					}
					let disagrees = acvr.contest_info.iter().any(|ci| {
						ci.contest == audit.contest && ci.consensus == Some(ConsensusValue::No)
					});
					if disagrees {
						disagreement_reasons.insert(audit.audit_reason);
					}
				}
				for reason in discrepancy_reasons {
					round.add_discrepancy(reason);
				}
				for reason in disagreement_reasons {
					round.add_disagreement(reason);
				}
			}
			round.actual_count += 1;
			position += 1;
			round.actual_audited_prefix_length = position;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rla_types::{CvrContestInfo, RecordType};

	fn elector(name: &str) -> Elector {
		Elector {
			first_name: name.into(),
			last_name: "Tester".into(),
			political_party: "Unaffiliated".into(),
		}
	}

	fn board() -> Vec<Elector> {
		vec![elector("Ada"), elector("Ben")]
	}

	fn cvr(id: CvrId, choices: &[&str]) -> CastVoteRecord {
		CastVoteRecord {
			id,
			record_type: RecordType::Uploaded,
			county_id: 7,
			cvr_number: id,
			scanner_id: 1,
			batch_id: "A".into(),
			record_id: id,
			imprinted_id: format!("1-A-{}", id),
			ballot_type: "Style 1".into(),
			contest_info: vec![CvrContestInfo {
				contest: "Governor".into(),
				consensus: None,
				choices: choices.iter().map(|c| c.to_string()).collect(),
			}],
			audit_flag: false,
		}
	}

	fn acvr(id: CvrId, choices: &[&str], consensus: ConsensusValue) -> CastVoteRecord {
		let mut acvr = cvr(id, choices);
		acvr.record_type = RecordType::AuditorEntered;
		acvr.contest_info[0].consensus = Some(consensus);
		acvr
	}

	fn dashboard_with_round(ids: &[CvrId]) -> CountyDashboard {
		let mut d = CountyDashboard::new(7);
		d.comparison_audits = vec![ComparisonAudit {
			contest: "Governor".into(),
			audit_reason: AuditReason::StateWideContest,
		}];
		d.set_cvrs_to_audit(ids.iter().map(|&id| cvr(id, &["Alice"])).collect());
		d.start_round(Utc::now(), ids.len() as u64, ids.to_vec(), ids.to_vec())
			.unwrap();
		d
	}

	#[test]
	fn audit_board_sign_in_enforces_minimum_size() {
		let mut d = CountyDashboard::new(7);
		let err = d.sign_in_audit_board(vec![elector("Ada")]).unwrap_err();
		assert!(matches!(
			err,
			DashboardError::AuditBoardTooSmall { actual: 1, .. }
		));
		d.sign_in_audit_board(board()).unwrap();
		assert!(d.has_audit_board());
		d.sign_out_audit_board();
		assert!(!d.has_audit_board());
	}

	#[test]
	fn second_round_cannot_open_over_the_first() {
		let mut d = dashboard_with_round(&[1, 2]);
		let err = d
			.start_round(Utc::now(), 2, vec![3, 4], vec![3, 4])
			.unwrap_err();
		assert!(matches!(err, DashboardError::RoundAlreadyOpen { county: 7 }));
		// The open round is untouched.
		assert_eq!(d.rounds.len(), 1);
	}

	#[test]
	fn counter_mutations_mirror_onto_the_open_round() {
		let mut d = dashboard_with_round(&[1, 2]);
		d.add_audited_ballot();
		d.add_discrepancy(AuditReason::StateWideContest);
		d.add_disagreement(AuditReason::StateWideContest);
		assert_eq!(d.ballots_audited, 1);
		let round = d.current_round().unwrap();
		assert_eq!(round.actual_count, 1);
		assert_eq!(round.discrepancies[&AuditReason::StateWideContest], 1);
		assert_eq!(round.disagreements[&AuditReason::StateWideContest], 1);

		d.end_round(Utc::now(), board()).unwrap();
		// With no open round the county-wide counter moves alone.
		d.add_audited_ballot();
		assert_eq!(d.ballots_audited, 2);
		assert_eq!(d.rounds[0].actual_count, 1);
	}

	#[test]
	fn end_round_requires_signatories_and_an_open_round() {
		let mut d = dashboard_with_round(&[1]);
		let err = d.end_round(Utc::now(), vec![elector("Ada")]).unwrap_err();
		assert!(matches!(err, DashboardError::NotEnoughSignatories { .. }));

		d.end_round(Utc::now(), board()).unwrap();
		assert!(d.rounds[0].is_ended());
		let err = d.end_round(Utc::now(), board()).unwrap_err();
		assert!(matches!(err, DashboardError::NoCurrentRound { county: 7 }));
	}

	#[test]
	fn cvr_under_audit_tracks_the_prefix() {
		let mut d = dashboard_with_round(&[1, 2]);
		assert_eq!(d.cvr_under_audit().map(|c| c.id), Some(1));
		d.record_adjudication(0, acvr(1, &["Alice"], ConsensusValue::Yes));
		assert_eq!(d.audited_prefix_length, 1);
		assert_eq!(d.cvr_under_audit().map(|c| c.id), Some(2));
		d.record_adjudication(1, acvr(2, &["Alice"], ConsensusValue::Yes));
		assert!(d.cvr_under_audit().is_none());
	}

	#[test]
	fn out_of_order_adjudication_does_not_advance_the_prefix() {
		let mut d = dashboard_with_round(&[1, 2, 3]);
		d.record_adjudication(2, acvr(3, &["Alice"], ConsensusValue::Yes));
		assert_eq!(d.audited_prefix_length, 0);
		d.record_adjudication(0, acvr(1, &["Alice"], ConsensusValue::Yes));
		assert_eq!(d.audited_prefix_length, 1);
	}

	#[test]
	fn update_round_attributes_discrepancies_and_disagreements() {
		let mut d = dashboard_with_round(&[1, 2, 3]);
		d.record_adjudication(0, acvr(1, &["Bob"], ConsensusValue::Yes));
		d.record_adjudication(1, acvr(2, &["Alice"], ConsensusValue::No));
		d.update_round().unwrap();

		let round = d.current_round().unwrap();
		assert_eq!(round.actual_count, 2);
		assert_eq!(round.actual_audited_prefix_length, 2);
		assert_eq!(round.discrepancies[&AuditReason::StateWideContest], 1);
		assert_eq!(round.disagreements[&AuditReason::StateWideContest], 1);
		assert_eq!(d.ballots_remaining_in_current_round(), 1);
	}

	#[test]
	fn update_round_is_idempotent_across_reconciliations() {
		let mut d = dashboard_with_round(&[1, 2, 3]);
		d.record_adjudication(0, acvr(1, &["Bob"], ConsensusValue::Yes));
		d.update_round().unwrap();
		d.update_round().unwrap();

		let round = d.current_round().unwrap();
		// The discrepant ballot is counted once, not once per call.
		assert_eq!(round.discrepancies[&AuditReason::StateWideContest], 1);
		assert_eq!(round.actual_count, 1);
		assert_eq!(round.actual_audited_prefix_length, 1);

		// Later adjudications extend the scan instead of repeating it.
		d.record_adjudication(1, acvr(2, &["Bob"], ConsensusValue::Yes));
		d.update_round().unwrap();
		let round = d.current_round().unwrap();
		assert_eq!(round.discrepancies[&AuditReason::StateWideContest], 2);
		assert_eq!(round.actual_count, 2);
		assert_eq!(round.actual_audited_prefix_length, 2);
	}

	#[test]
	fn update_round_caps_attribution_at_expected_count() {
		let mut d = dashboard_with_round(&[1, 2, 3]);
		// Shrink the round's workload below the adjudicated prefix.
		d.rounds[0].expected_count = 2;
		for (position, id) in [(0, 1), (1, 2), (2, 3)] {
			d.record_adjudication(position, acvr(id, &["Bob"], ConsensusValue::Yes));
		}
		d.update_round().unwrap();

		let round = d.current_round().unwrap();
		// The third adjudicated position is never attributed to this round.
		assert_eq!(round.actual_count, 2);
		assert_eq!(round.discrepancies[&AuditReason::StateWideContest], 2);
		assert_eq!(round.actual_audited_prefix_length, 2);
	}

	#[test]
	fn update_round_scan_resumes_from_the_start_prefix() {
		let mut d = dashboard_with_round(&[1, 2]);
		d.record_adjudication(0, acvr(1, &["Alice"], ConsensusValue::Yes));
		d.record_adjudication(1, acvr(2, &["Alice"], ConsensusValue::Yes));
		d.end_round(Utc::now(), board()).unwrap();

		// Round two starts with the prefix already at 2.
		d.add_cvrs_to_audit(vec![cvr(3, &["Alice"])]);
		d.start_round(Utc::now(), 1, vec![3], vec![3]).unwrap();
		d.record_adjudication(2, acvr(3, &["Bob"], ConsensusValue::Yes));
		d.update_round().unwrap();

		let round = d.current_round().unwrap();
		assert_eq!(round.start_audited_prefix_length, 2);
		assert_eq!(round.actual_count, 1);
		assert_eq!(round.discrepancies[&AuditReason::StateWideContest], 1);
	}
}
