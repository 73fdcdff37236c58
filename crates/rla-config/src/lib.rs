//! Configuration module for the RLA coordinator.
//!
//! This module provides structures and utilities for managing coordinator
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required configuration values are
//! properly set.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the RLA coordinator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to the coordinator instance.
	pub coordinator: CoordinatorConfig,
	/// Configuration for the audit being coordinated.
	pub audit: AuditConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
}

/// Configuration specific to the coordinator instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoordinatorConfig {
	/// Unique identifier for this coordinator instance.
	pub id: String,
}

/// Configuration for the audit being coordinated.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
	/// The risk limit, strictly between 0 and 1.
	pub risk_limit: Decimal,
	/// The deadline for manifest and CVR uploads, if one is enforced.
	pub upload_deadline: Option<DateTime<Utc>>,
	/// Multiplier applied to estimate-based round sizes.
	/// Defaults to 1 if not specified.
	#[serde(default = "default_round_multiplier")]
	pub round_multiplier: Decimal,
}

/// Returns the default round-size multiplier.
fn default_round_multiplier() -> Decimal {
	Decimal::ONE
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
}

impl Config {
	/// Loads configuration from a TOML file and validates it.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let contents = tokio::fs::read_to_string(path).await?;
		Self::from_toml(&contents)
	}

	/// Parses configuration from a TOML string and validates it.
	pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(contents)?;
		config.validate()?;
		Ok(config)
	}

	/// Validates the configuration to ensure all required fields are
	/// properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.coordinator.id.is_empty() {
			return Err(ConfigError::Validation(
				"Coordinator ID cannot be empty".into(),
			));
		}
		if self.audit.risk_limit <= Decimal::ZERO || self.audit.risk_limit >= Decimal::ONE {
			return Err(ConfigError::Validation(
				"Risk limit must be strictly between 0 and 1".into(),
			));
		}
		if self.audit.round_multiplier <= Decimal::ZERO {
			return Err(ConfigError::Validation(
				"Round multiplier must be greater than 0".into(),
			));
		}
		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const VALID: &str = r#"
		[coordinator]
		id = "rla-coordinator"

		[audit]
		risk_limit = "0.05"
		upload_deadline = "2026-11-17T18:00:00Z"

		[storage]
		primary = "memory"
	"#;

	#[test]
	fn valid_config_parses_with_defaults() {
		let config = Config::from_toml(VALID).unwrap();
		assert_eq!(config.coordinator.id, "rla-coordinator");
		assert_eq!(config.audit.risk_limit, Decimal::new(5, 2));
		assert_eq!(config.audit.round_multiplier, Decimal::ONE);
		assert!(config.audit.upload_deadline.is_some());
		assert_eq!(config.storage.primary, "memory");
	}

	#[test]
	fn risk_limit_must_be_a_proper_fraction() {
		let contents = VALID.replace("\"0.05\"", "\"1.5\"");
		let err = Config::from_toml(&contents).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));

		let contents = VALID.replace("\"0.05\"", "\"0\"");
		assert!(Config::from_toml(&contents).is_err());
	}

	#[test]
	fn empty_coordinator_id_is_rejected() {
		let contents = VALID.replace("\"rla-coordinator\"", "\"\"");
		let err = Config::from_toml(&contents).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn malformed_toml_is_a_parse_error() {
		let err = Config::from_toml("[coordinator").unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[tokio::test]
	async fn from_file_reads_and_validates() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(VALID.as_bytes()).unwrap();
		let config = Config::from_file(file.path().to_str().unwrap())
			.await
			.unwrap();
		assert_eq!(config.coordinator.id, "rla-coordinator");
	}
}
