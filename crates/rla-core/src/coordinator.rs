//! Workflow coordinator.
//!
//! Drives state-machine events from planner and ledger outcomes: round
//! one classification per county, subsequent-round sizing and planning,
//! round close attribution, and the statewide completion check. All
//! per-subject state (dashboards and machine instances) lives behind the
//! versioned store, so two racing steps against the same subject cannot
//! both succeed from the same prior state.

use crate::dashboard::{CountyDashboard, DashboardError};
use crate::policy::{PolicyError, SamplePolicy};
use chrono::{DateTime, Utc};
use rla_selection::{RoundPlan, RoundPlanner, SelectionError};
use rla_storage::{StorageError, StorageKey, StorageService, Versioned};
use rla_types::{CountyId, CvrId, Elector};
use rla_workflow::{
	audit_board, county, dos, AuditBoardEvent, AuditBoardState, CountyEvent, CountyState,
	DosEvent, DosState, Machine, WorkflowError,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during coordinator operations.
#[derive(Debug, Error)]
pub enum CoordinatorError {
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
	#[error("Selection error: {0}")]
	Selection(#[from] SelectionError),
	#[error(transparent)]
	Workflow(#[from] WorkflowError),
	#[error(transparent)]
	Dashboard(#[from] DashboardError),
	#[error("Policy error: {0}")]
	Policy(#[from] PolicyError),
	#[error("county {0} is not registered")]
	UnknownCounty(CountyId),
}

/// How one county's round one resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOneOutcome {
	/// Ballots were drawn and the round is open.
	Started,
	/// No comparison audits drive this county; nothing to audit.
	NoContestsToAudit,
	/// The risk limit is already satisfied; nothing to audit.
	RiskLimitAchieved,
	/// A required upload missed the deadline; the county never receives
	/// a start event.
	DeadlineMissed,
}

/// How to size a subsequent round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundSize {
	/// Draw up to the policy's estimate scaled by a multiplier.
	EstimatedSamples { multiplier: Decimal },
	/// Draw a fixed number of ballots, ignoring the estimates.
	FixedLength(u64),
}

/// Coordinates workflows, rounds, and ledgers across all counties.
pub struct WorkflowCoordinator {
	storage: Arc<StorageService>,
	planner: RoundPlanner,
	policy: Arc<dyn SamplePolicy>,
}

impl WorkflowCoordinator {
	/// Creates a coordinator over the given storage, planner, and policy.
	pub fn new(
		storage: Arc<StorageService>,
		planner: RoundPlanner,
		policy: Arc<dyn SamplePolicy>,
	) -> Self {
		Self {
			storage,
			planner,
			policy,
		}
	}

	/// Registers a county: a fresh ledger and machines in their initial
	/// states.
	pub async fn register_county(&self, county_id: CountyId) -> Result<(), CoordinatorError> {
		let id = county_id.to_string();
		self.storage
			.store(
				StorageKey::Dashboards.as_str(),
				&id,
				&CountyDashboard::new(county_id),
			)
			.await?;
		self.storage
			.store(
				StorageKey::CountyMachines.as_str(),
				&id,
				&county::definition().initial_state(),
			)
			.await?;
		self.storage
			.store(
				StorageKey::AuditBoardMachines.as_str(),
				&id,
				&audit_board::definition().initial_state(),
			)
			.await?;
		tracing::info!(county = county_id, "county registered");
		Ok(())
	}

	/// All registered counties, ascending.
	pub async fn counties(&self) -> Result<Vec<CountyId>, CoordinatorError> {
		let ids = self.storage.ids_in(StorageKey::Dashboards.as_str()).await?;
		let mut counties: Vec<CountyId> = ids.iter().filter_map(|id| id.parse().ok()).collect();
		counties.sort_unstable();
		Ok(counties)
	}

	/// The county's current ledger.
	pub async fn dashboard(&self, county_id: CountyId) -> Result<CountyDashboard, CoordinatorError> {
		match self
			.storage
			.retrieve(StorageKey::Dashboards.as_str(), &county_id.to_string())
			.await
		{
			Ok(dashboard) => Ok(dashboard),
			Err(StorageError::NotFound) => Err(CoordinatorError::UnknownCounty(county_id)),
			Err(e) => Err(e.into()),
		}
	}

	/// Applies a mutation to the county's ledger and persists it under
	/// the version it was read at. A racing writer surfaces as
	/// `StorageError::Conflict`; the caller may retry against fresh
	/// state.
	pub async fn update_dashboard<F>(
		&self,
		county_id: CountyId,
		updater: F,
	) -> Result<CountyDashboard, CoordinatorError>
	where
		F: FnOnce(&mut CountyDashboard) -> Result<(), DashboardError>,
	{
		let id = county_id.to_string();
		let Versioned { mut value, version } = match self
			.storage
			.retrieve_versioned::<CountyDashboard>(StorageKey::Dashboards.as_str(), &id)
			.await
		{
			Ok(v) => v,
			Err(StorageError::NotFound) => return Err(CoordinatorError::UnknownCounty(county_id)),
			Err(e) => return Err(e.into()),
		};
		updater(&mut value)?;
		self.storage
			.store_versioned(StorageKey::Dashboards.as_str(), &id, &value, version)
			.await?;
		Ok(value)
	}

	/// The county workflow's current state.
	pub async fn county_state(&self, county_id: CountyId) -> Result<CountyState, CoordinatorError> {
		self.machine_state(StorageKey::CountyMachines, county_id)
			.await
	}

	/// Steps the county workflow.
	pub async fn step_county(
		&self,
		county_id: CountyId,
		event: &CountyEvent,
	) -> Result<CountyState, CoordinatorError> {
		let id = county_id.to_string();
		let Versioned { value, version } = self
			.retrieve_machine(StorageKey::CountyMachines, county_id)
			.await?;
		let mut machine = Machine::with_state(county::definition(), value);
		let next = machine.step(event)?;
		self.storage
			.store_versioned(StorageKey::CountyMachines.as_str(), &id, &next, version)
			.await?;
		Ok(next)
	}

	/// The audit board workflow's current state.
	pub async fn audit_board_state(
		&self,
		county_id: CountyId,
	) -> Result<AuditBoardState, CoordinatorError> {
		self.machine_state(StorageKey::AuditBoardMachines, county_id)
			.await
	}

	/// Steps the county's audit board workflow.
	pub async fn step_audit_board(
		&self,
		county_id: CountyId,
		event: &AuditBoardEvent,
	) -> Result<AuditBoardState, CoordinatorError> {
		let id = county_id.to_string();
		let Versioned { value, version } = self
			.retrieve_machine(StorageKey::AuditBoardMachines, county_id)
			.await?;
		let mut machine = Machine::with_state(audit_board::definition(), value);
		let next = machine.step(event)?;
		self.storage
			.store_versioned(StorageKey::AuditBoardMachines.as_str(), &id, &next, version)
			.await?;
		Ok(next)
	}

	/// The state administrator workflow's current state.
	pub async fn dos_state(&self) -> Result<DosState, CoordinatorError> {
		Ok(self.dos_versioned().await?.value)
	}

	/// Steps the state administrator workflow.
	pub async fn step_dos(&self, event: &DosEvent) -> Result<DosState, CoordinatorError> {
		let Versioned { value, version } = self.dos_versioned().await?;
		let mut machine = Machine::with_state(dos::definition(), value);
		let next = machine.step(event)?;
		self.storage
			.store_versioned(StorageKey::DosMachine.as_str(), "state", &next, version)
			.await?;
		Ok(next)
	}

	async fn dos_versioned(&self) -> Result<Versioned<DosState>, CoordinatorError> {
		match self
			.storage
			.retrieve_versioned(StorageKey::DosMachine.as_str(), "state")
			.await
		{
			Ok(v) => Ok(v),
			Err(StorageError::NotFound) => Ok(Versioned {
				value: dos::definition().initial_state(),
				version: 0,
			}),
			Err(e) => Err(e.into()),
		}
	}

	async fn machine_state<S>(
		&self,
		key: StorageKey,
		county_id: CountyId,
	) -> Result<S, CoordinatorError>
	where
		S: serde::de::DeserializeOwned,
	{
		Ok(self.retrieve_machine(key, county_id).await?.value)
	}

	async fn retrieve_machine<S>(
		&self,
		key: StorageKey,
		county_id: CountyId,
	) -> Result<Versioned<S>, CoordinatorError>
	where
		S: serde::de::DeserializeOwned,
	{
		match self
			.storage
			.retrieve_versioned(key.as_str(), &county_id.to_string())
			.await
		{
			Ok(v) => Ok(v),
			Err(StorageError::NotFound) => Err(CoordinatorError::UnknownCounty(county_id)),
			Err(e) => Err(e.into()),
		}
	}

	/// Starts round one for every registered county.
	///
	/// A county whose manifest or CVR upload missed the deadline never
	/// receives a start event; its audit board is marked unable to audit.
	/// Otherwise the county is classified by its audit data: a round is
	/// opened, or the county is complete before it begins (no driving
	/// contests, or zero ballots needed).
	pub async fn start_round_one(
		&self,
		deadline: DateTime<Utc>,
		start_time: DateTime<Utc>,
	) -> Result<HashMap<CountyId, RoundOneOutcome>, CoordinatorError> {
		let mut outcomes = HashMap::new();
		for county_id in self.counties().await? {
			let dashboard = self.dashboard(county_id).await?;
			let on_time = matches!(
				(dashboard.manifest_uploaded_at, dashboard.cvrs_uploaded_at),
				(Some(manifest), Some(cvrs)) if manifest <= deadline && cvrs <= deadline
			);
			if !on_time {
				tracing::warn!(county = county_id, "upload deadline missed");
				self.step_audit_board(county_id, &AuditBoardEvent::DeadlineMissed)
					.await?;
				outcomes.insert(county_id, RoundOneOutcome::DeadlineMissed);
				continue;
			}
			let outcome = self.initialize_audit_data(county_id, start_time).await?;
			match outcome {
				RoundOneOutcome::Started => {
					self.step_county(county_id, &CountyEvent::StartAudit).await?;
					self.step_audit_board(county_id, &AuditBoardEvent::RoundStart)
						.await?;
				}
				RoundOneOutcome::NoContestsToAudit => {
					self.step_county(county_id, &CountyEvent::StartAudit).await?;
					self.step_county(county_id, &CountyEvent::CloseOut).await?;
					self.step_audit_board(county_id, &AuditBoardEvent::NoContestsToAudit)
						.await?;
				}
				RoundOneOutcome::RiskLimitAchieved => {
					self.step_county(county_id, &CountyEvent::StartAudit).await?;
					self.step_county(county_id, &CountyEvent::CloseOut).await?;
					self.step_audit_board(county_id, &AuditBoardEvent::RiskLimitAchieved)
						.await?;
				}
				RoundOneOutcome::DeadlineMissed => {}
			}
			tracing::info!(county = county_id, outcome = ?outcome, "round one classified");
			outcomes.insert(county_id, outcome);
		}
		Ok(outcomes)
	}

	async fn initialize_audit_data(
		&self,
		county_id: CountyId,
		start_time: DateTime<Utc>,
	) -> Result<RoundOneOutcome, CoordinatorError> {
		let dashboard = self.dashboard(county_id).await?;
		if dashboard.comparison_audits.is_empty() {
			return Ok(RoundOneOutcome::NoContestsToAudit);
		}
		let estimated = self.policy.estimated_samples_to_audit(&dashboard).await?;
		let optimistic = self.policy.optimistic_samples_to_audit(&dashboard).await?;
		if optimistic == 0 {
			return Ok(RoundOneOutcome::RiskLimitAchieved);
		}
		let plan = self
			.plan_round(county_id, 0, optimistic, &HashSet::new())
			.await?;
		self.update_dashboard(county_id, move |d| {
			d.estimated_samples_to_audit = estimated;
			d.optimistic_samples_to_audit = optimistic;
			d.set_cvrs_to_audit(plan.ballot_records);
			d.start_round(
				start_time,
				plan.expected_count,
				plan.ballot_sequence,
				plan.audit_subsequence,
			)?;
			Ok(())
		})
		.await?;
		Ok(RoundOneOutcome::Started)
	}

	/// Starts a subsequent round for the targeted counties.
	///
	/// Counties whose audit board never started, or already finished, are
	/// skipped. A county with a round still open is a hard stop for the
	/// whole call. Planning failure aborts that county's audit.
	pub async fn start_subsequent_round(
		&self,
		counties: &[CountyId],
		size: RoundSize,
		start_time: DateTime<Utc>,
	) -> Result<Vec<CountyId>, CoordinatorError> {
		let mut started = Vec::new();
		for &county_id in counties {
			let board = self.audit_board_state(county_id).await?;
			let machine = Machine::with_state(audit_board::definition(), board);
			if machine.is_in_initial_state() || machine.is_in_final_state() {
				continue;
			}
			let dashboard = self.dashboard(county_id).await?;
			if dashboard.current_round_index.is_some() {
				return Err(DashboardError::RoundAlreadyOpen { county: county_id }.into());
			}
			let draws_consumed: usize = dashboard
				.rounds
				.iter()
				.map(|r| r.audit_subsequence.len())
				.sum();
			let count = match size {
				RoundSize::FixedLength(length) => length,
				RoundSize::EstimatedSamples { multiplier } => {
					let estimated = self.policy.estimated_samples_to_audit(&dashboard).await?;
					let scaled = (Decimal::from(estimated) * multiplier)
						.ceil()
						.to_u64()
						.unwrap_or(estimated);
					scaled.saturating_sub(draws_consumed as u64)
				}
			};
			if count == 0 {
				continue;
			}
			let exclusions: HashSet<CvrId> = dashboard
				.rounds
				.iter()
				.flat_map(|r| r.ballot_sequence.iter().copied())
				.collect();
			match self
				.plan_round(county_id, draws_consumed, count, &exclusions)
				.await
			{
				Ok(plan) => {
					self.update_dashboard(county_id, move |d| {
						d.add_cvrs_to_audit(plan.ballot_records);
						d.start_round(
							start_time,
							plan.expected_count,
							plan.ballot_sequence,
							plan.audit_subsequence,
						)?;
						Ok(())
					})
					.await?;
					self.step_audit_board(county_id, &AuditBoardEvent::RoundStart)
						.await?;
					started.push(county_id);
				}
				Err(err) => {
					tracing::error!(
						county = county_id,
						error = %err,
						"round planning failed, aborting county audit"
					);
					self.step_audit_board(county_id, &AuditBoardEvent::AbortAudit)
						.await?;
					return Err(err);
				}
			}
		}
		Ok(started)
	}

	async fn plan_round(
		&self,
		county_id: CountyId,
		start_index: usize,
		count: u64,
		exclusions: &HashSet<CvrId>,
	) -> Result<RoundPlan, CoordinatorError> {
		let draws = self.policy.draws(county_id, start_index, count).await?;
		let plan = self
			.planner
			.define_round(county_id, &draws, exclusions)
			.await?;
		Ok(plan)
	}

	/// Attributes adjudicated positions to the county's open round.
	pub async fn update_round(&self, county_id: CountyId) -> Result<(), CoordinatorError> {
		self.update_dashboard(county_id, |d| d.update_round()).await?;
		Ok(())
	}

	/// Closes the county's open round: attributes the remaining
	/// adjudicated positions, then signs it off.
	pub async fn end_round(
		&self,
		county_id: CountyId,
		end_time: DateTime<Utc>,
		signatories: Vec<Elector>,
	) -> Result<(), CoordinatorError> {
		self.update_dashboard(county_id, move |d| {
			d.update_round()?;
			d.end_round(end_time, signatories)
		})
		.await?;
		Ok(())
	}

	/// Whether every county's audit board has reached a final state.
	/// When that first becomes true, the state administrator workflow is
	/// stepped to its audit-complete state.
	pub async fn check_statewide_completion(&self) -> Result<bool, CoordinatorError> {
		let counties = self.counties().await?;
		if counties.is_empty() {
			return Ok(false);
		}
		for county_id in counties {
			let state = self.audit_board_state(county_id).await?;
			if !Machine::with_state(audit_board::definition(), state).is_in_final_state() {
				return Ok(false);
			}
		}
		if self.dos_state().await? == DosState::AuditOngoing {
			tracing::info!("every county audit board is final, statewide audit complete");
			self.step_dos(&DosEvent::CountyAuditComplete).await?;
		}
		Ok(true)
	}
}
