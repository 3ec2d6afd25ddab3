//! Simulation request and result shapes
//!
//! Field names are camelCase on the wire and must stay stable: the orchestrator
//! and external RPC endpoints both consume them.

pub mod revert;

pub use revert::{decode_revert, RevertInfo};

use alloy_primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
	#[error("no payloads to simulate")]
	EmptyBatch,

	#[error("failed to fork {rpc_url} (chain {chain_id}): {reason}")]
	ForkFailed {
		rpc_url: String,
		chain_id: u64,
		reason: String,
	},

	#[error("fork reports chain {actual}, expected {expected}")]
	ChainMismatch { expected: u64, actual: u64 },

	#[error("simulation timed out after {timeout_ms}ms")]
	Timeout { timeout_ms: u64 },

	#[error("simulation cancelled")]
	Cancelled,

	#[error("rpc error: {0}")]
	Rpc(String),
}

/// One transaction to simulate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TxPayload {
	pub rpc_url: String,
	pub chain_id: u64,
	pub from: Address,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to: Option<Address>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Bytes>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<U256>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas_limit: Option<u64>,
	/// "latest" when unset
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub block_tag: Option<String>,
}

impl TxPayload {
	pub fn fork_target(&self) -> ForkTarget {
		ForkTarget {
			rpc_url: self.rpc_url.clone(),
			chain_id: self.chain_id,
		}
	}

	pub fn block_tag(&self) -> &str {
		self.block_tag.as_deref().unwrap_or("latest")
	}
}

/// Payloads with equal targets share one fork
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ForkTarget {
	pub rpc_url: String,
	pub chain_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForkMetadata {
	pub block_number: u64,
	pub rpc_url: String,
	/// Block timestamp in seconds
	pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
	Success,
	Revert,
	Error,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GasTotals {
	pub used: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refund: Option<u64>,
}

/// Log emitted during simulation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedEvent {
	pub address: Address,
	pub topics: Vec<B256>,
	pub data: Bytes,
	/// Event signature resolved from a registry, when known
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub signature: Option<String>,
}

/// Result of simulating one payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
	pub fork_metadata: ForkMetadata,
	pub summary_status: SummaryStatus,
	pub gas_totals: GasTotals,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub revert_reason: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_selector: Option<String>,
	#[serde(default)]
	pub trace: serde_json::Value,
	#[serde(default)]
	pub events: Vec<SimulatedEvent>,
}

impl SimulationResult {
	pub fn is_success(&self) -> bool {
		self.summary_status == SummaryStatus::Success
	}

	/// Result for a step that failed before execution (e.g. fork creation)
	pub fn error(fork_metadata: ForkMetadata, message: impl Into<String>) -> Self {
		Self {
			fork_metadata,
			summary_status: SummaryStatus::Error,
			gas_totals: GasTotals::default(),
			revert_reason: Some(message.into()),
			error_selector: None,
			trace: serde_json::Value::Null,
			events: vec![],
		}
	}
}

/// A single result, or one result per payload in input order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SimulationOutcome {
	Batch { steps: Vec<SimulationResult> },
	Single(SimulationResult),
}

/// Rolled-up view of an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateStatus {
	pub status: SummaryStatus,
	pub gas: GasTotals,
	pub failed_step: Option<usize>,
}

impl SimulationOutcome {
	pub fn steps(&self) -> &[SimulationResult] {
		match self {
			SimulationOutcome::Batch { steps } => steps,
			SimulationOutcome::Single(result) => std::slice::from_ref(result),
		}
	}

	/// First non-success step decides the status; gas is summed, refund only if any step has one
	pub fn aggregate(&self) -> AggregateStatus {
		let steps = self.steps();
		let failed_step = steps.iter().position(|s| !s.is_success());
		let status = failed_step
			.map(|i| steps[i].summary_status)
			.unwrap_or(SummaryStatus::Success);

		let used = steps
			.iter()
			.fold(0u64, |acc, s| acc.saturating_add(s.gas_totals.used));
		let refund = steps
			.iter()
			.filter_map(|s| s.gas_totals.refund)
			.reduce(|a, b| a.saturating_add(b));

		AggregateStatus {
			status,
			gas: GasTotals { used, refund },
			failed_step,
		}
	}

	pub fn first_failure(&self) -> Option<&SimulationResult> {
		self.steps().iter().find(|s| !s.is_success())
	}
}

/// What a session keeps from its latest simulation run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
	pub status: SummaryStatus,
	pub gas_used: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas_refund: Option<u64>,
	pub step_count: usize,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub failed_step: Option<usize>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub revert_reason: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_selector: Option<String>,
	/// Fingerprint of the session's actions and params at simulation time
	pub params_hash: String,
	pub simulated_at: DateTime<Utc>,
	/// Full per-step results
	pub outcome: SimulationOutcome,
}

impl SimulationSummary {
	pub fn from_outcome(outcome: SimulationOutcome, params_hash: String) -> Self {
		let aggregate = outcome.aggregate();
		let failure = outcome.first_failure();
		Self {
			status: aggregate.status,
			gas_used: aggregate.gas.used,
			gas_refund: aggregate.gas.refund,
			step_count: outcome.steps().len(),
			failed_step: aggregate.failed_step,
			revert_reason: failure.and_then(|f| f.revert_reason.clone()),
			error_selector: failure.and_then(|f| f.error_selector.clone()),
			params_hash,
			simulated_at: Utc::now(),
			outcome,
		}
	}

	pub fn is_success(&self) -> bool {
		self.status == SummaryStatus::Success
	}
}
