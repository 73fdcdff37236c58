//! Storage module for the RLA coordinator.
//!
//! This module provides the persistence boundary: a low-level versioned
//! key-value interface, a typed service on top of it for machine instances
//! and dashboards, and the two domain stores the round planner reads from
//! (ballot manifests and CVR exports). In-memory implementations back the
//! tests and the development service.

use async_trait::async_trait;
use rla_types::{BallotManifestEntry, CastVoteRecord, CountyId, CvrId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs when a conditional write loses an optimistic-lock
	/// race. Retryable: re-read, re-apply, re-write.
	#[error("Version conflict on {key}: expected {expected}, found {actual}")]
	Conflict {
		key: String,
		expected: u64,
		actual: u64,
	},
}

/// A stored value together with the version the store assigned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
	pub value: T,
	pub version: u64,
}

/// Trait defining the low-level interface for storage backends.
///
/// Every key carries a monotonically increasing version, starting at 1 on
/// first write. Writes may be conditional on the current version; a
/// mismatch fails with `StorageError::Conflict` and leaves the stored
/// value untouched.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes and the current version for the given key.
	async fn get_bytes(&self, key: &str) -> Result<(Vec<u8>, u64), StorageError>;

	/// Stores raw bytes, optionally conditional on the key's current
	/// version. Returns the new version.
	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		expected_version: Option<u64>,
	) -> Result<u64, StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns all keys starting with the given prefix, sorted.
	async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level storage backend and provides
/// convenient methods for storing and retrieving typed data with
/// automatic serialization/deserialization. Keys are formed from a
/// namespace and an id.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Stores a serializable value unconditionally. Returns the new
	/// version.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<u64, StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&Self::key(namespace, id), bytes, None)
			.await
	}

	/// Stores a serializable value conditional on the version last read.
	/// Fails with `StorageError::Conflict` if another writer got there
	/// first.
	pub async fn store_versioned<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
		expected_version: u64,
	) -> Result<u64, StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&Self::key(namespace, id), bytes, Some(expected_version))
			.await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		Ok(self.retrieve_versioned(namespace, id).await?.value)
	}

	/// Retrieves a value together with its current version, for use with
	/// `store_versioned`.
	pub async fn retrieve_versioned<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Versioned<T>, StorageError> {
		let (bytes, version) = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		let value = serde_json::from_slice(&bytes)
			.map_err(|e| StorageError::Serialization(e.to_string()))?;
		Ok(Versioned { value, version })
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	/// Returns the ids stored under the given namespace, sorted.
	pub async fn ids_in(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		let prefix = format!("{}:", namespace);
		let keys = self.backend.keys(&prefix).await?;
		Ok(keys
			.into_iter()
			.map(|k| k[prefix.len()..].to_string())
			.collect())
	}
}

/// Namespaces used for persisted coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKey {
	Dashboards,
	CountyMachines,
	AuditBoardMachines,
	DosMachine,
}

impl StorageKey {
	/// The namespace string for this key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Dashboards => "dashboards",
			StorageKey::CountyMachines => "county_machines",
			StorageKey::AuditBoardMachines => "audit_board_machines",
			StorageKey::DosMachine => "dos_machine",
		}
	}
}

/// Read access to a county's ballot manifest.
#[async_trait]
pub trait ManifestStore: Send + Sync {
	/// The manifest entry whose sequence range covers the given number,
	/// if the county's manifest has one.
	async fn entry_covering(
		&self,
		county_id: CountyId,
		sequence_number: u64,
	) -> Result<Option<BallotManifestEntry>, StorageError>;

	/// The total number of ballots in the county's manifest.
	async fn ballot_count(&self, county_id: CountyId) -> Result<u64, StorageError>;
}

/// Read access to the uploaded cast-vote records.
#[async_trait]
pub trait CvrStore: Send + Sync {
	/// The CVR at the given physical ballot location, if one was uploaded.
	async fn at_location(
		&self,
		county_id: CountyId,
		scanner_id: u32,
		batch_id: &str,
		record_id: u64,
	) -> Result<Option<CastVoteRecord>, StorageError>;

	/// The CVRs with the given ids, in id order of the input. Ids with no
	/// record are skipped.
	async fn by_ids(&self, ids: &[CvrId]) -> Result<Vec<CastVoteRecord>, StorageError>;
}
