//! Fork-based transaction simulation
//!
//! Payloads sharing a `{rpc_url, chain_id}` target run one after another on a
//! single fork, so an approval is visible to the transfer that follows it.
//! Payloads on different targets get their own forks and run concurrently.

pub mod planner;
pub mod rpc_fork;

pub use planner::{plan, ForkGroup};
pub use rpc_fork::{JsonRpcForkBackend, RpcFork};

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use usdc_types::{
	ForkMetadata, ForkTarget, SimulationError, SimulationOutcome, SimulationResult, TxPayload,
};

pub const DEFAULT_SIMULATION_TIMEOUT_MS: u64 = 60_000;

/// A forked view of chain state that accumulates the effects of executed payloads
#[async_trait]
pub trait Fork: Send {
	fn metadata(&self) -> &ForkMetadata;

	/// Execute on top of every payload this fork has already executed
	async fn execute(&mut self, payload: &TxPayload) -> Result<SimulationResult, SimulationError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ForkBackend: Send + Sync {
	async fn open(
		&self,
		target: &ForkTarget,
		block_tag: &str,
	) -> Result<Box<dyn Fork>, SimulationError>;
}

#[derive(Clone)]
pub struct SimulationEngine {
	backend: Arc<dyn ForkBackend>,
	timeout: Duration,
}

impl SimulationEngine {
	pub fn new(backend: Arc<dyn ForkBackend>) -> Self {
		Self {
			backend,
			timeout: Duration::from_millis(DEFAULT_SIMULATION_TIMEOUT_MS),
		}
	}

	pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.timeout = Duration::from_millis(timeout_ms);
		self
	}

	pub async fn simulate(
		&self,
		payloads: &[TxPayload],
	) -> Result<SimulationOutcome, SimulationError> {
		self.simulate_with(payloads, None).await
	}

	/// Run a batch; one payload yields [`SimulationOutcome::Single`], more yield a
	/// batch whose steps follow input order.
	pub async fn simulate_with(
		&self,
		payloads: &[TxPayload],
		cancel: Option<CancellationToken>,
	) -> Result<SimulationOutcome, SimulationError> {
		if payloads.is_empty() {
			return Err(SimulationError::EmptyBatch);
		}

		let groups = plan(payloads);
		info!(
			"Simulating {} payloads on {} forks",
			payloads.len(),
			groups.len()
		);

		let runs = groups.iter().map(|group| self.run_group(group));
		let cancel = cancel.unwrap_or_default();
		let finished = tokio::select! {
			finished = timeout(self.timeout, join_all(runs)) => {
				finished.map_err(|_| SimulationError::Timeout {
					timeout_ms: self.timeout.as_millis() as u64,
				})?
			},
			_ = cancel.cancelled() => return Err(SimulationError::Cancelled),
		};

		let mut slots: Vec<Option<SimulationResult>> = vec![None; payloads.len()];
		for (index, result) in finished.into_iter().flatten() {
			slots[index] = Some(result);
		}
		let steps: Vec<SimulationResult> = slots.into_iter().flatten().collect();

		match <[SimulationResult; 1]>::try_from(steps) {
			Ok([only]) => Ok(SimulationOutcome::Single(only)),
			Err(steps) => Ok(SimulationOutcome::Batch { steps }),
		}
	}

	async fn run_group(&self, group: &ForkGroup) -> Vec<(usize, SimulationResult)> {
		let target = &group.target;
		let mut fork = match self.backend.open(target, &group.block_tag).await {
			Ok(fork) => fork,
			Err(e) => {
				warn!(
					"Could not fork {} (chain {}): {}",
					target.rpc_url, target.chain_id, e
				);
				let metadata = ForkMetadata {
					block_number: 0,
					rpc_url: target.rpc_url.clone(),
					timestamp: 0,
				};
				return group
					.members
					.iter()
					.map(|(index, _)| (*index, SimulationResult::error(metadata.clone(), e.to_string())))
					.collect();
			},
		};

		let mut results = Vec::with_capacity(group.members.len());
		for (index, payload) in &group.members {
			let result = match fork.execute(payload).await {
				Ok(result) => result,
				Err(e) => {
					warn!("Step {} failed on chain {}: {}", index, target.chain_id, e);
					SimulationResult::error(fork.metadata().clone(), e.to_string())
				},
			};
			debug!(
				"Step {} on chain {} finished: {:?} ({} gas)",
				index, target.chain_id, result.summary_status, result.gas_totals.used
			);
			results.push((*index, result));
		}
		results
	}
}
