//! Ballot resolver and round planner.
//!
//! Turns a list of random draw numbers into the ordered, deduplicated
//! ballot sequence a county must pull for one audit round. Resolution
//! goes draw number -> manifest range -> physical location -> CVR, with a
//! phantom record substituted when no CVR was uploaded for a location.
//! Everything here is deterministic: all randomness enters through the
//! `draws` input.

use crate::order;
use rla_storage::{CvrStore, ManifestStore, StorageError};
use rla_types::{BallotManifestEntry, CastVoteRecord, CountyId, CvrId};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during ballot selection.
#[derive(Debug, Error)]
pub enum SelectionError {
	/// A draw number falls outside every declared manifest range. A
	/// data-integrity fault: the enclosing round definition aborts and no
	/// partial round is committed.
	#[error("no manifest entry in county {county_id} covers draw {draw}")]
	MissingManifestCoverage { county_id: CountyId, draw: u64 },
	/// Error from the underlying stores.
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

/// One resolved draw: the sequence position it was assigned, the draw
/// number, the manifest entry that covers it, and the CVR (or phantom)
/// at the resolved location.
#[derive(Debug, Clone)]
pub struct ResolvedDraw {
	/// Ascending position in the raw audit subsequence, from 0.
	pub sequence_number: u64,
	/// The random draw number.
	pub draw: u64,
	/// The manifest entry covering the draw.
	pub entry: BallotManifestEntry,
	/// The record at the resolved location, phantom if none was uploaded.
	pub cvr: CastVoteRecord,
}

/// The output of defining one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundPlan {
	/// The draw numbers the round was defined from, in input order.
	pub generated_numbers: Vec<u64>,
	/// CVR ids in draw order, duplicates preserved.
	pub audit_subsequence: Vec<CvrId>,
	/// CVR ids in canonical pull order, deduplicated and with prior
	/// rounds' ballots excluded.
	pub ballot_sequence: Vec<CvrId>,
	/// The records behind `ballot_sequence`, in the same order. Phantom
	/// records have no stored row, so the plan carries them itself rather
	/// than leaving callers to re-fetch by id.
	pub ballot_records: Vec<CastVoteRecord>,
	/// The round's workload: the length of `ballot_sequence`.
	pub expected_count: u64,
}

/// Resolves draws against the manifest and CVR stores and plans rounds.
pub struct RoundPlanner {
	manifests: Arc<dyn ManifestStore>,
	cvrs: Arc<dyn CvrStore>,
}

impl RoundPlanner {
	/// Creates a planner over the given stores.
	pub fn new(manifests: Arc<dyn ManifestStore>, cvrs: Arc<dyn CvrStore>) -> Self {
		Self { manifests, cvrs }
	}

	/// Resolves one draw to its manifest entry and the record at the
	/// resolved location, substituting a phantom when none was uploaded.
	pub async fn resolve(
		&self,
		county_id: CountyId,
		draw: u64,
	) -> Result<(BallotManifestEntry, CastVoteRecord), SelectionError> {
		let entry = self
			.manifests
			.entry_covering(county_id, draw)
			.await?
			.ok_or(SelectionError::MissingManifestCoverage { county_id, draw })?;
		let position = entry.ballot_position(draw);
		let cvr = self
			.cvrs
			.at_location(county_id, entry.scanner_id, &entry.batch_id, position)
			.await?;
		let cvr = match cvr {
			Some(cvr) => cvr,
			None => {
				tracing::debug!(
					county = county_id,
					draw,
					location = %entry.imprinted_id(draw),
					"no CVR at resolved location, substituting phantom record"
				);
				phantom_at(county_id, draw, &entry, position)
			}
		};
		Ok((entry, cvr))
	}

	/// Resolves every draw in input order, assigning ascending sequence
	/// numbers from 0.
	pub async fn select_ballots(
		&self,
		county_id: CountyId,
		draws: &[u64],
	) -> Result<Vec<ResolvedDraw>, SelectionError> {
		let mut resolved = Vec::with_capacity(draws.len());
		for (index, &draw) in draws.iter().enumerate() {
			let (entry, cvr) = self.resolve(county_id, draw).await?;
			resolved.push(ResolvedDraw {
				sequence_number: index as u64,
				draw,
				entry,
				cvr,
			});
		}
		Ok(resolved)
	}

	/// Defines a round: the raw draw-order subsequence plus the sorted,
	/// deduplicated, exclusion-filtered ballot sequence the county pulls.
	///
	/// Pure given the stores and inputs; identical inputs always produce
	/// an identical plan.
	pub async fn define_round(
		&self,
		county_id: CountyId,
		draws: &[u64],
		exclusions: &HashSet<CvrId>,
	) -> Result<RoundPlan, SelectionError> {
		let resolved = self.select_ballots(county_id, draws).await?;
		let audit_subsequence = order::cvr_ids(&resolved);
		let sorted = order::sort(&resolved);
		let deduplicated = order::dedup(&sorted);
		let ballot_records: Vec<CastVoteRecord> = deduplicated
			.into_iter()
			.filter(|r| !exclusions.contains(&r.cvr.id))
			.map(|r| r.cvr)
			.collect();
		let ballot_sequence: Vec<CvrId> = ballot_records.iter().map(|c| c.id).collect();
		let expected_count = ballot_sequence.len() as u64;
		tracing::debug!(
			county = county_id,
			draws = draws.len(),
			expected = expected_count,
			"defined round ballot sequence"
		);
		Ok(RoundPlan {
			generated_numbers: draws.to_vec(),
			audit_subsequence,
			ballot_sequence,
			ballot_records,
			expected_count,
		})
	}

	/// Re-fetches the given CVRs and re-sorts them into canonical pull
	/// order, re-resolving each record's manifest entry by its own draw
	/// number. Reproduces the order the original round definition
	/// produced for the same ids.
	pub async fn prepare_ballot_sequence(
		&self,
		county_id: CountyId,
		cvr_ids: &[CvrId],
	) -> Result<Vec<CastVoteRecord>, SelectionError> {
		let cvrs = self.cvrs.by_ids(cvr_ids).await?;
		let mut keyed = Vec::with_capacity(cvrs.len());
		for cvr in cvrs {
			let entry = self
				.manifests
				.entry_covering(county_id, cvr.cvr_number)
				.await?
				.ok_or(SelectionError::MissingManifestCoverage {
					county_id,
					draw: cvr.cvr_number,
				})?;
			let position = entry.ballot_position(cvr.cvr_number);
			keyed.push((entry.scanner_id, entry.batch_id, position, cvr));
		}
		keyed.sort_by(|a, b| {
			a.0.cmp(&b.0)
				.then_with(|| order::alphanumeric_cmp(&a.1, &b.1))
				.then_with(|| a.2.cmp(&b.2))
		});
		Ok(keyed.into_iter().map(|(_, _, _, cvr)| cvr).collect())
	}
}

/// The phantom record standing in for a missing CVR, placed at the
/// resolved location so it sorts and deduplicates like a real record.
fn phantom_at(
	county_id: CountyId,
	draw: u64,
	entry: &BallotManifestEntry,
	position: u64,
) -> CastVoteRecord {
	let mut phantom = CastVoteRecord::phantom_record();
	phantom.county_id = county_id;
	phantom.cvr_number = draw;
	phantom.scanner_id = entry.scanner_id;
	phantom.batch_id = entry.batch_id.clone();
	phantom.record_id = position;
	phantom.imprinted_id = entry.imprinted_id(draw);
	phantom
}

#[cfg(test)]
mod tests {
	use super::*;
	use rla_storage::implementations::memory::{MemoryCvrStore, MemoryManifestStore};
	use rla_types::{RecordType, PHANTOM_RECORD_ID};

	const COUNTY: CountyId = 7;

	fn entry(start: u64, end: u64, scanner: u32, batch: &str) -> BallotManifestEntry {
		BallotManifestEntry {
			county_id: COUNTY,
			scanner_id: scanner,
			batch_id: batch.into(),
			batch_size: end - start + 1,
			storage_location: "Bin 1".into(),
			sequence_start: start,
			sequence_end: end,
		}
	}

	fn cvr(id: CvrId, number: u64, scanner: u32, batch: &str, record: u64) -> CastVoteRecord {
		CastVoteRecord {
			id,
			record_type: RecordType::Uploaded,
			county_id: COUNTY,
			cvr_number: number,
			scanner_id: scanner,
			batch_id: batch.into(),
			record_id: record,
			imprinted_id: format!("{}-{}-{}", scanner, batch, record),
			ballot_type: "Style 1".into(),
			contest_info: Vec::new(),
			audit_flag: false,
		}
	}

	async fn planner_with_batch_a() -> RoundPlanner {
		let manifests = MemoryManifestStore::new();
		manifests.add_entries(vec![entry(1, 100, 1, "A")]).await;
		let cvrs = MemoryCvrStore::new();
		for number in [3, 5, 9] {
			cvrs.add_cvr(cvr(number + 100, number, 1, "A", number)).await;
		}
		RoundPlanner::new(Arc::new(manifests), Arc::new(cvrs))
	}

	#[tokio::test]
	async fn missing_cvr_resolves_to_a_phantom_at_the_location() {
		let planner = planner_with_batch_a().await;
		let (entry, cvr) = planner.resolve(COUNTY, 42).await.unwrap();
		assert_eq!(entry.batch_id, "A");
		assert_eq!(cvr.id, PHANTOM_RECORD_ID);
		assert!(cvr.is_phantom());
		assert_eq!(cvr.record_id, 42);
		assert_eq!(cvr.imprinted_id, "1-A-42");
	}

	#[tokio::test]
	async fn uncovered_draw_aborts_the_round_definition() {
		let planner = planner_with_batch_a().await;
		let err = planner
			.define_round(COUNTY, &[5, 101], &HashSet::new())
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			SelectionError::MissingManifestCoverage { draw: 101, .. }
		));
	}

	#[tokio::test]
	async fn duplicate_draws_survive_in_the_subsequence_but_not_the_sequence() {
		let planner = planner_with_batch_a().await;
		let plan = planner
			.define_round(COUNTY, &[5, 3, 5, 9], &HashSet::new())
			.await
			.unwrap();
		assert_eq!(plan.generated_numbers, vec![5, 3, 5, 9]);
		assert_eq!(plan.audit_subsequence, vec![105, 103, 105, 109]);
		// Pull order within one batch is position order.
		assert_eq!(plan.ballot_sequence, vec![103, 105, 109]);
		assert_eq!(plan.expected_count, 3);
	}

	#[tokio::test]
	async fn exclusions_remove_prior_rounds_ballots() {
		let planner = planner_with_batch_a().await;
		let exclusions: HashSet<CvrId> = [105].into_iter().collect();
		let plan = planner
			.define_round(COUNTY, &[5, 3, 9], &exclusions)
			.await
			.unwrap();
		assert_eq!(plan.ballot_sequence, vec![103, 109]);
		assert_eq!(plan.expected_count, 2);
		// The raw subsequence is untouched by exclusions.
		assert_eq!(plan.audit_subsequence, vec![105, 103, 109]);
	}

	#[tokio::test]
	async fn phantom_draws_keep_their_position_in_the_plan() {
		let planner = planner_with_batch_a().await;
		let plan = planner
			.define_round(COUNTY, &[5, 42], &HashSet::new())
			.await
			.unwrap();
		assert_eq!(plan.ballot_sequence, vec![105, PHANTOM_RECORD_ID]);
		assert_eq!(plan.expected_count, 2);
		// The plan carries the phantom record itself; there is nothing to
		// fetch for it by id.
		assert_eq!(plan.ballot_records.len(), 2);
		assert!(plan.ballot_records[1].is_phantom());
		assert_eq!(plan.ballot_records[1].record_id, 42);
		assert_eq!(plan.ballot_records[1].imprinted_id, "1-A-42");
	}

	#[tokio::test]
	async fn define_round_is_pure() {
		let planner = planner_with_batch_a().await;
		let draws = [9, 3, 5];
		let first = planner
			.define_round(COUNTY, &draws, &HashSet::new())
			.await
			.unwrap();
		let second = planner
			.define_round(COUNTY, &draws, &HashSet::new())
			.await
			.unwrap();
		assert_eq!(first, second);
	}

	#[tokio::test]
	async fn pull_order_spans_scanners_and_alphanumeric_batches() {
		let manifests = MemoryManifestStore::new();
		manifests
			.add_entries(vec![
				entry(1, 10, 2, "9"),
				entry(11, 20, 2, "10"),
				entry(21, 30, 1, "B"),
			])
			.await;
		let cvrs = MemoryCvrStore::new();
		cvrs.add_cvr(cvr(1, 5, 2, "9", 5)).await;
		cvrs.add_cvr(cvr(2, 15, 2, "10", 5)).await;
		cvrs.add_cvr(cvr(3, 25, 1, "B", 5)).await;
		let planner = RoundPlanner::new(Arc::new(manifests), Arc::new(cvrs));

		let plan = planner
			.define_round(COUNTY, &[15, 5, 25], &HashSet::new())
			.await
			.unwrap();
		// Scanner 1 first, then scanner 2's batch "9" before batch "10".
		assert_eq!(plan.ballot_sequence, vec![3, 1, 2]);
	}

	#[tokio::test]
	async fn prepare_ballot_sequence_reproduces_the_round_order() {
		let planner = planner_with_batch_a().await;
		let plan = planner
			.define_round(COUNTY, &[9, 5, 3], &HashSet::new())
			.await
			.unwrap();
		let prepared = planner
			.prepare_ballot_sequence(COUNTY, &plan.ballot_sequence)
			.await
			.unwrap();
		let ids: Vec<CvrId> = prepared.iter().map(|c| c.id).collect();
		assert_eq!(ids, plan.ballot_sequence);
	}
}
