//! Main entry point for the RLA coordinator service.
//!
//! This binary wires the coordinator together: it loads configuration,
//! initializes logging, builds the storage and planning components, and
//! keeps the coordinator available until interrupted. Ballot data and
//! audit events arrive through out-of-scope collaborators; this service
//! owns the shared state they drive.

use clap::Parser;
use rla_config::Config;
use rla_core::{StaticSamplePolicy, WorkflowCoordinator};
use rla_selection::RoundPlanner;
use rla_storage::implementations::memory::{MemoryCvrStore, MemoryManifestStore, MemoryStorage};
use rla_storage::{StorageInterface, StorageService};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line arguments for the coordinator service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the coordinator service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the workflow coordinator
/// 5. Runs until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started RLA coordinator");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!(
		"Loaded configuration [{}], risk limit {}",
		config.coordinator.id,
		config.audit.risk_limit
	);

	let _coordinator = build_coordinator(&config)?;

	tracing::info!("Coordinator ready, waiting for shutdown signal");
	tokio::signal::ctrl_c().await?;
	tracing::info!("Shutting down");

	Ok(())
}

/// Builds the workflow coordinator from configuration.
///
/// The backend is selected by `storage.primary`; only `memory` is
/// implemented today, and unknown names are rejected rather than
/// silently replaced. The storage traits are the seam a persistent
/// backend would plug into.
fn build_coordinator(config: &Config) -> Result<WorkflowCoordinator, Box<dyn std::error::Error>> {
	let backend: Box<dyn StorageInterface> = match config.storage.primary.as_str() {
		"memory" => Box::new(MemoryStorage::new()),
		other => return Err(format!("Unsupported storage backend: {}", other).into()),
	};
	tracing::debug!(backend = %config.storage.primary, "building storage");
	let storage = Arc::new(StorageService::new(backend));
	let planner = RoundPlanner::new(
		Arc::new(MemoryManifestStore::new()),
		Arc::new(MemoryCvrStore::new()),
	);
	let policy = Arc::new(StaticSamplePolicy {
		sequence: Vec::new(),
		estimated: 0,
		optimistic: 0,
	});
	Ok(WorkflowCoordinator::new(storage, planner, policy))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config_with_backend(backend: &str) -> Config {
		Config::from_toml(&format!(
			r#"
			[coordinator]
			id = "rla-coordinator"

			[audit]
			risk_limit = "0.05"

			[storage]
			primary = "{}"
			"#,
			backend
		))
		.unwrap()
	}

	#[test]
	fn storage_backend_is_selected_by_name() {
		assert!(build_coordinator(&config_with_backend("memory")).is_ok());
		assert!(build_coordinator(&config_with_backend("redis")).is_err());
	}
}
