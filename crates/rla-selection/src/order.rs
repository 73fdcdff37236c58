//! Canonical pull order and pure sequence helpers.
//!
//! County staff retrieve physical ballots scanner by scanner, batch by
//! batch, position by position. Batch identifiers are compared
//! alphanumerically so that batch "9" pulls before batch "10". All
//! helpers here return new sequences and never mutate their inputs.

use crate::ResolvedDraw;
use rla_types::{CastVoteRecord, CvrId};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Compares two strings alphanumerically: runs of digits compare by
/// numeric value, everything else byte-wise.
pub fn alphanumeric_cmp(a: &str, b: &str) -> Ordering {
	let mut left = a.as_bytes();
	let mut right = b.as_bytes();
	loop {
		match (left.first(), right.first()) {
			(None, None) => return Ordering::Equal,
			(None, Some(_)) => return Ordering::Less,
			(Some(_), None) => return Ordering::Greater,
			(Some(&l), Some(&r)) => {
				if l.is_ascii_digit() && r.is_ascii_digit() {
					let left_run = left.iter().take_while(|c| c.is_ascii_digit()).count();
					let right_run = right.iter().take_while(|c| c.is_ascii_digit()).count();
					let l_digits = trim_leading_zeros(&left[..left_run]);
					let r_digits = trim_leading_zeros(&right[..right_run]);
					// Longer digit run (after zeros) is the larger number.
					let ordering = l_digits
						.len()
						.cmp(&r_digits.len())
						.then_with(|| l_digits.cmp(r_digits));
					if ordering != Ordering::Equal {
						return ordering;
					}
					left = &left[left_run..];
					right = &right[right_run..];
				} else {
					match l.cmp(&r) {
						Ordering::Equal => {
							left = &left[1..];
							right = &right[1..];
						}
						other => return other,
					}
				}
			}
		}
	}
}

fn trim_leading_zeros(digits: &[u8]) -> &[u8] {
	let first = digits.iter().position(|&c| c != b'0');
	match first {
		Some(index) => &digits[index..],
		None => &digits[digits.len().saturating_sub(1)..],
	}
}

/// The canonical physical-pull order for two records: scanner, then
/// batch (alphanumeric), then position within the batch.
pub fn pull_order(a: &CastVoteRecord, b: &CastVoteRecord) -> Ordering {
	a.scanner_id
		.cmp(&b.scanner_id)
		.then_with(|| alphanumeric_cmp(&a.batch_id, &b.batch_id))
		.then_with(|| a.record_id.cmp(&b.record_id))
}

/// Returns the resolved draws sorted into canonical pull order.
pub fn sort(resolved: &[ResolvedDraw]) -> Vec<ResolvedDraw> {
	let mut sorted = resolved.to_vec();
	sorted.sort_by(|a, b| pull_order(&a.cvr, &b.cvr));
	sorted
}

/// Returns the numbers sorted ascending.
pub fn sort_numbers(numbers: &[u64]) -> Vec<u64> {
	let mut sorted = numbers.to_vec();
	sorted.sort_unstable();
	sorted
}

/// Returns the resolved draws with duplicate records removed, keeping
/// the first occurrence of each CVR identifier.
pub fn dedup(resolved: &[ResolvedDraw]) -> Vec<ResolvedDraw> {
	let mut seen = HashSet::new();
	resolved
		.iter()
		.filter(|r| seen.insert(r.cvr.id))
		.cloned()
		.collect()
}

/// Returns the numbers with duplicates removed, keeping the first
/// occurrence of each.
pub fn dedup_numbers(numbers: &[u64]) -> Vec<u64> {
	let mut seen = HashSet::new();
	numbers
		.iter()
		.copied()
		.filter(|n| seen.insert(*n))
		.collect()
}

/// Returns the numbers with every member of `exclusions` removed.
pub fn exclude_numbers(numbers: &[u64], exclusions: &HashSet<u64>) -> Vec<u64> {
	numbers
		.iter()
		.copied()
		.filter(|n| !exclusions.contains(n))
		.collect()
}

/// The CVR identifiers of the given resolved draws, in input order.
pub fn cvr_ids(resolved: &[ResolvedDraw]) -> Vec<CvrId> {
	resolved.iter().map(|r| r.cvr.id).collect()
}

/// Returns only the records not yet audited.
pub fn un_audited(cvrs: &[CastVoteRecord]) -> Vec<CastVoteRecord> {
	cvrs.iter().filter(|c| !c.audit_flag).cloned().collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn alphanumeric_compares_digit_runs_numerically() {
		assert_eq!(alphanumeric_cmp("batch9", "batch10"), Ordering::Less);
		assert_eq!(alphanumeric_cmp("batch10", "batch9"), Ordering::Greater);
		assert_eq!(alphanumeric_cmp("batch007", "batch7"), Ordering::Equal);
		assert_eq!(alphanumeric_cmp("A2", "B1"), Ordering::Less);
		assert_eq!(alphanumeric_cmp("", "A"), Ordering::Less);
	}

	#[test]
	fn dedup_keeps_first_occurrence() {
		assert_eq!(dedup_numbers(&[5, 3, 5, 9]), vec![5, 3, 9]);
	}

	#[test]
	fn exclude_filters_without_mutating() {
		let input = vec![1, 2, 3, 4];
		let exclusions: HashSet<u64> = [2, 4].into_iter().collect();
		assert_eq!(exclude_numbers(&input, &exclusions), vec![1, 3]);
		assert_eq!(input, vec![1, 2, 3, 4]);
	}

	#[test]
	fn sort_numbers_returns_a_new_sequence() {
		let input = vec![9, 5, 3, 5];
		assert_eq!(sort_numbers(&input), vec![3, 5, 5, 9]);
		assert_eq!(input, vec![9, 5, 3, 5]);
	}

	#[test]
	fn un_audited_drops_flagged_records() {
		let mut audited = CastVoteRecord::phantom_record();
		audited.id = 1;
		audited.audit_flag = true;
		let mut fresh = CastVoteRecord::phantom_record();
		fresh.id = 2;
		let remaining = un_audited(&[audited, fresh]);
		assert_eq!(remaining.len(), 1);
		assert_eq!(remaining[0].id, 2);
	}
}
