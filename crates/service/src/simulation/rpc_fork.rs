//! Fork backend over a plain JSON-RPC node
//!
//! Opening a fork checks the node's chain id and pins the requested block.
//! Every step is run through `eth_simulateV1` on top of the pinned block,
//! replaying the fork's earlier successful calls in the same simulated block.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use usdc_types::models::parse_chain_id as parse_quantity;
use usdc_types::simulation::decode_revert;
use usdc_types::{
	ForkMetadata, ForkTarget, GasTotals, SimulatedEvent, SimulationError, SimulationResult,
	SummaryStatus, TxPayload,
};

use super::{Fork, ForkBackend};

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
	result: Option<T>,
	#[serde(default)]
	error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
	code: i64,
	message: String,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
	number: String,
	timestamp: String,
}

#[derive(Debug, Deserialize)]
struct SimulatedBlock {
	#[serde(default)]
	calls: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallResult {
	status: String,
	gas_used: String,
	#[serde(default)]
	return_data: Bytes,
	#[serde(default)]
	logs: Vec<CallLog>,
	#[serde(default)]
	error: Option<CallError>,
}

#[derive(Debug, Deserialize)]
struct CallLog {
	address: Address,
	#[serde(default)]
	topics: Vec<B256>,
	#[serde(default)]
	data: Bytes,
}

#[derive(Debug, Deserialize)]
struct CallError {
	message: String,
	#[serde(default)]
	data: Option<Bytes>,
}

async fn rpc_call<T: DeserializeOwned>(
	client: &reqwest::Client,
	url: &str,
	method: &str,
	params: Value,
) -> Result<T, SimulationError> {
	let body = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params});
	let response = client
		.post(url)
		.json(&body)
		.send()
		.await
		.map_err(|e| SimulationError::Rpc(format!("{} request failed: {}", method, e)))?;

	let status = response.status();
	if !status.is_success() {
		return Err(SimulationError::Rpc(format!(
			"{} returned HTTP {}",
			method,
			status.as_u16()
		)));
	}

	let parsed: RpcResponse<T> = response
		.json()
		.await
		.map_err(|e| SimulationError::Rpc(format!("invalid {} response: {}", method, e)))?;
	if let Some(err) = parsed.error {
		return Err(SimulationError::Rpc(format!(
			"{} failed ({}): {}",
			method, err.code, err.message
		)));
	}
	parsed
		.result
		.ok_or_else(|| SimulationError::Rpc(format!("{} returned no result", method)))
}

/// Opens [`RpcFork`]s against the payload's own `rpc_url`
#[derive(Debug, Clone, Default)]
pub struct JsonRpcForkBackend {
	client: reqwest::Client,
}

impl JsonRpcForkBackend {
	pub fn new(client: reqwest::Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl ForkBackend for JsonRpcForkBackend {
	async fn open(
		&self,
		target: &ForkTarget,
		block_tag: &str,
	) -> Result<Box<dyn Fork>, SimulationError> {
		let failed = |reason: String| SimulationError::ForkFailed {
			rpc_url: target.rpc_url.clone(),
			chain_id: target.chain_id,
			reason,
		};

		let chain_hex: String = rpc_call(&self.client, &target.rpc_url, "eth_chainId", json!([]))
			.await
			.map_err(|e| failed(e.to_string()))?;
		let actual = parse_quantity(&chain_hex)
			.ok_or_else(|| failed(format!("invalid chain id {}", chain_hex)))?;
		if actual != target.chain_id {
			return Err(SimulationError::ChainMismatch {
				expected: target.chain_id,
				actual,
			});
		}

		let block: BlockHeader = rpc_call(
			&self.client,
			&target.rpc_url,
			"eth_getBlockByNumber",
			json!([block_tag, false]),
		)
		.await
		.map_err(|e| failed(e.to_string()))?;

		let metadata = ForkMetadata {
			block_number: parse_quantity(&block.number)
				.ok_or_else(|| failed(format!("invalid block number {}", block.number)))?,
			rpc_url: target.rpc_url.clone(),
			timestamp: parse_quantity(&block.timestamp)
				.ok_or_else(|| failed(format!("invalid timestamp {}", block.timestamp)))?,
		};
		debug!(
			"Forked chain {} at block {} via {}",
			target.chain_id, metadata.block_number, target.rpc_url
		);

		Ok(Box::new(RpcFork {
			client: self.client.clone(),
			metadata,
			executed: Vec::new(),
		}))
	}
}

/// Fork pinned to one block; successful calls are kept for replay
pub struct RpcFork {
	client: reqwest::Client,
	metadata: ForkMetadata,
	executed: Vec<Value>,
}

fn call_object(payload: &TxPayload) -> Value {
	let mut call = json!({ "from": payload.from });
	if let Some(to) = payload.to {
		call["to"] = json!(to);
	}
	if let Some(data) = &payload.data {
		call["input"] = json!(data);
	}
	if let Some(value) = payload.value {
		call["value"] = Value::String(format!("0x{:x}", value));
	}
	if let Some(gas) = payload.gas_limit {
		call["gas"] = Value::String(format!("0x{:x}", gas));
	}
	call
}

#[async_trait]
impl Fork for RpcFork {
	fn metadata(&self) -> &ForkMetadata {
		&self.metadata
	}

	async fn execute(&mut self, payload: &TxPayload) -> Result<SimulationResult, SimulationError> {
		let call = call_object(payload);
		let mut calls = self.executed.clone();
		calls.push(call.clone());

		let params = json!([
			{
				"blockStateCalls": [{ "calls": calls }],
				"validation": false,
				"traceTransfers": true
			},
			format!("0x{:x}", self.metadata.block_number)
		]);
		let blocks: Vec<SimulatedBlock> =
			rpc_call(&self.client, &self.metadata.rpc_url, "eth_simulateV1", params).await?;

		let trace = blocks
			.into_iter()
			.next()
			.and_then(|block| block.calls.into_iter().last())
			.ok_or_else(|| SimulationError::Rpc("eth_simulateV1 returned no calls".to_string()))?;
		let outcome: CallResult = serde_json::from_value(trace.clone())
			.map_err(|e| SimulationError::Rpc(format!("invalid call result: {}", e)))?;

		let gas_used = parse_quantity(&outcome.gas_used).unwrap_or_default();
		let mut result = SimulationResult {
			fork_metadata: self.metadata.clone(),
			summary_status: SummaryStatus::Success,
			gas_totals: GasTotals {
				used: gas_used,
				refund: None,
			},
			revert_reason: None,
			error_selector: None,
			trace,
			events: Vec::new(),
		};

		if parse_quantity(&outcome.status) == Some(1) {
			result.events = outcome
				.logs
				.into_iter()
				.map(|log| SimulatedEvent {
					address: log.address,
					topics: log.topics,
					data: log.data,
					signature: None,
				})
				.collect();
			self.executed.push(call);
		} else {
			let (message, data) = match outcome.error {
				Some(err) => (Some(err.message), err.data.unwrap_or(outcome.return_data)),
				None => (None, outcome.return_data),
			};
			let revert = decode_revert(&data);
			// Out of gas, invalid opcodes and bare reverts carry nothing to decode
			result.summary_status = if revert.reason.is_some() || revert.selector.is_some() {
				SummaryStatus::Revert
			} else {
				SummaryStatus::Error
			};
			result.revert_reason = revert.reason.or(message);
			result.error_selector = revert.selector;
		}

		Ok(result)
	}
}
