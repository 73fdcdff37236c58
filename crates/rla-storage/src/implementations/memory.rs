//! In-memory storage backend implementations.
//!
//! These implementations hold everything in HashMaps behind read-write
//! locks, providing fast access but no persistence across restarts. They
//! back the tests and the development service.

use crate::{CvrStore, ManifestStore, StorageError, StorageInterface};
use async_trait::async_trait;
use rla_types::{BallotManifestEntry, CastVoteRecord, CountyId, CvrId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory versioned key-value store.
pub struct MemoryStorage {
	/// Value and version per key, protected by a read-write lock.
	store: Arc<RwLock<HashMap<String, (Vec<u8>, u64)>>>,
}

impl MemoryStorage {
	/// Creates a new MemoryStorage instance.
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<(Vec<u8>, u64), StorageError> {
		let store = self.store.read().await;
		store.get(key).cloned().ok_or(StorageError::NotFound)
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		expected_version: Option<u64>,
	) -> Result<u64, StorageError> {
		let mut store = self.store.write().await;
		let current = store.get(key).map(|(_, version)| *version).unwrap_or(0);
		if let Some(expected) = expected_version {
			if expected != current {
				return Err(StorageError::Conflict {
					key: key.to_string(),
					expected,
					actual: current,
				});
			}
		}
		let next = current + 1;
		store.insert(key.to_string(), (value, next));
		Ok(next)
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(store.contains_key(key))
	}

	async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let store = self.store.read().await;
		let mut keys: Vec<String> = store
			.keys()
			.filter(|k| k.starts_with(prefix))
			.cloned()
			.collect();
		keys.sort();
		Ok(keys)
	}
}

/// In-memory ballot-manifest store.
///
/// Entries are kept per county, sorted by sequence range, so a covering
/// lookup is a binary search on the range starts.
pub struct MemoryManifestStore {
	entries: RwLock<HashMap<CountyId, Vec<BallotManifestEntry>>>,
}

impl MemoryManifestStore {
	/// Creates an empty manifest store.
	pub fn new() -> Self {
		Self {
			entries: RwLock::new(HashMap::new()),
		}
	}

	/// Adds a county's manifest entries, keeping them ordered by range.
	pub async fn add_entries(&self, entries: Vec<BallotManifestEntry>) {
		let mut map = self.entries.write().await;
		for entry in entries {
			let county = map.entry(entry.county_id).or_default();
			county.push(entry);
			county.sort_by_key(|e| e.sequence_start);
		}
	}
}

impl Default for MemoryManifestStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl ManifestStore for MemoryManifestStore {
	async fn entry_covering(
		&self,
		county_id: CountyId,
		sequence_number: u64,
	) -> Result<Option<BallotManifestEntry>, StorageError> {
		let map = self.entries.read().await;
		let Some(county) = map.get(&county_id) else {
			return Ok(None);
		};
		// Last entry whose range starts at or before the number.
		let index = county.partition_point(|e| e.sequence_start <= sequence_number);
		if index == 0 {
			return Ok(None);
		}
		let candidate = &county[index - 1];
		Ok(candidate.covers(sequence_number).then(|| candidate.clone()))
	}

	async fn ballot_count(&self, county_id: CountyId) -> Result<u64, StorageError> {
		let map = self.entries.read().await;
		Ok(map
			.get(&county_id)
			.map(|county| county.iter().map(|e| e.batch_size).sum())
			.unwrap_or(0))
	}
}

/// In-memory cast-vote record store, indexed by id and by physical
/// ballot location.
pub struct MemoryCvrStore {
	inner: RwLock<CvrIndex>,
}

#[derive(Default)]
struct CvrIndex {
	by_id: HashMap<CvrId, CastVoteRecord>,
	by_location: HashMap<(CountyId, u32, String, u64), CvrId>,
}

impl MemoryCvrStore {
	/// Creates an empty CVR store.
	pub fn new() -> Self {
		Self {
			inner: RwLock::new(CvrIndex::default()),
		}
	}

	/// Adds an uploaded record to both indexes.
	pub async fn add_cvr(&self, cvr: CastVoteRecord) {
		let mut inner = self.inner.write().await;
		inner.by_location.insert(
			(cvr.county_id, cvr.scanner_id, cvr.batch_id.clone(), cvr.record_id),
			cvr.id,
		);
		inner.by_id.insert(cvr.id, cvr);
	}
}

impl Default for MemoryCvrStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl CvrStore for MemoryCvrStore {
	async fn at_location(
		&self,
		county_id: CountyId,
		scanner_id: u32,
		batch_id: &str,
		record_id: u64,
	) -> Result<Option<CastVoteRecord>, StorageError> {
		let inner = self.inner.read().await;
		let id = inner
			.by_location
			.get(&(county_id, scanner_id, batch_id.to_string(), record_id));
		Ok(id.and_then(|id| inner.by_id.get(id)).cloned())
	}

	async fn by_ids(&self, ids: &[CvrId]) -> Result<Vec<CastVoteRecord>, StorageError> {
		let inner = self.inner.read().await;
		Ok(ids
			.iter()
			.filter_map(|id| inner.by_id.get(id))
			.cloned()
			.collect())
	}
}
