//! Typed session actions
//!
//! Each [`ActionType`] has exactly one parameter struct. Its `Default` impl is the
//! declared default payload, and unknown fields survive in `extra` without being
//! interpreted.

pub mod registry;

pub use registry::{action_definition, ActionDefinition, ACTION_DEFINITIONS};

use crate::models::Amount;
use crate::routes::TxRequest;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Full-range ticks for a 60 tick-spacing pool
pub const MIN_TICK: i32 = -887_220;
pub const MAX_TICK: i32 = 887_220;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
	#[error("overrides for {action_type} must be a JSON object")]
	InvalidOverrides { action_type: ActionType },

	#[error("invalid params for {action_type}: {reason}")]
	InvalidParams {
		action_type: ActionType,
		reason: String,
	},

	#[error("{action_type} is missing required param '{param}'")]
	MissingParam {
		action_type: ActionType,
		param: String,
	},

	#[error("{action_type} param '{param}' must be positive")]
	NonPositive {
		action_type: ActionType,
		param: String,
	},
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
	Swap,
	Bridge,
	AddLiquidity,
	CreateChannel,
	CloseChannel,
	Approve,
	Transfer,
}

impl ActionType {
	pub const ALL: [ActionType; 7] = [
		ActionType::Swap,
		ActionType::Bridge,
		ActionType::AddLiquidity,
		ActionType::CreateChannel,
		ActionType::CloseChannel,
		ActionType::Approve,
		ActionType::Transfer,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			ActionType::Swap => "swap",
			ActionType::Bridge => "bridge",
			ActionType::AddLiquidity => "addLiquidity",
			ActionType::CreateChannel => "createChannel",
			ActionType::CloseChannel => "closeChannel",
			ActionType::Approve => "approve",
			ActionType::Transfer => "transfer",
		}
	}
}

impl fmt::Display for ActionType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BridgeProtocol {
	#[default]
	Cctp,
	Lifi,
	Gateway,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SwapParams {
	pub chain_id: u64,
	pub token_in: Option<Address>,
	pub token_out: Option<Address>,
	pub amount_in: Amount,
	pub slippage_bps: u32,
	/// Swap provider that produced `transaction`
	pub provider: Option<String>,
	pub transaction: Option<TxRequest>,
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

impl Default for SwapParams {
	fn default() -> Self {
		Self {
			chain_id: 1,
			token_in: None,
			token_out: None,
			amount_in: Amount::ZERO,
			slippage_bps: 50,
			provider: None,
			transaction: None,
			extra: BTreeMap::new(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeParams {
	pub protocol: BridgeProtocol,
	pub from_chain: u64,
	pub to_chain: u64,
	/// Burn token on the source chain; USDC when unset
	pub token: Option<Address>,
	pub amount: Amount,
	/// Defaults to the sender
	pub recipient: Option<Address>,
	pub max_fee: Amount,
	/// 1000 = fast, 2000 = standard (finalized)
	pub min_finality_threshold: u32,
	pub transaction: Option<TxRequest>,
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

impl Default for BridgeParams {
	fn default() -> Self {
		Self {
			protocol: BridgeProtocol::Cctp,
			from_chain: 1,
			to_chain: 8453,
			token: None,
			amount: Amount::ZERO,
			recipient: None,
			max_fee: Amount::ZERO,
			min_finality_threshold: 2000,
			transaction: None,
			extra: BTreeMap::new(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AddLiquidityParams {
	pub chain_id: u64,
	pub pool_id: Option<String>,
	pub token0: Option<Address>,
	pub token1: Option<Address>,
	pub amount0: Amount,
	pub amount1: Amount,
	/// Fee tier in hundredths of a bip
	pub fee: u32,
	pub tick_lower: i32,
	pub tick_upper: i32,
	pub transaction: Option<TxRequest>,
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

impl Default for AddLiquidityParams {
	fn default() -> Self {
		Self {
			chain_id: 1,
			pool_id: None,
			token0: None,
			token1: None,
			amount0: Amount::ZERO,
			amount1: Amount::ZERO,
			fee: 3000,
			tick_lower: MIN_TICK,
			tick_upper: MAX_TICK,
			transaction: None,
			extra: BTreeMap::new(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateChannelParams {
	pub chain_id: u64,
	pub counterparty: Option<Address>,
	pub token: Option<Address>,
	pub amount: Amount,
	pub challenge_period_secs: u64,
	pub transaction: Option<TxRequest>,
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

impl Default for CreateChannelParams {
	fn default() -> Self {
		Self {
			chain_id: 1,
			counterparty: None,
			token: None,
			amount: Amount::ZERO,
			challenge_period_secs: 3600,
			transaction: None,
			extra: BTreeMap::new(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CloseChannelParams {
	pub chain_id: u64,
	pub channel_id: Option<String>,
	pub transaction: Option<TxRequest>,
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

impl Default for CloseChannelParams {
	fn default() -> Self {
		Self {
			chain_id: 1,
			channel_id: None,
			transaction: None,
			extra: BTreeMap::new(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApproveParams {
	pub chain_id: u64,
	pub token: Option<Address>,
	pub spender: Option<Address>,
	/// Zero revokes
	pub amount: Amount,
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

impl Default for ApproveParams {
	fn default() -> Self {
		Self {
			chain_id: 1,
			token: None,
			spender: None,
			amount: Amount::ZERO,
			extra: BTreeMap::new(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferParams {
	pub chain_id: u64,
	pub token: Option<Address>,
	/// When set the transfer spends an allowance (`transferFrom`)
	pub from: Option<Address>,
	pub recipient: Option<Address>,
	pub amount: Amount,
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

impl Default for TransferParams {
	fn default() -> Self {
		Self {
			chain_id: 1,
			token: None,
			from: None,
			recipient: None,
			amount: Amount::ZERO,
			extra: BTreeMap::new(),
		}
	}
}

/// One typed on-chain operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "params", rename_all = "camelCase")]
pub enum Action {
	Swap(SwapParams),
	Bridge(BridgeParams),
	AddLiquidity(AddLiquidityParams),
	CreateChannel(CreateChannelParams),
	CloseChannel(CloseChannelParams),
	Approve(ApproveParams),
	Transfer(TransferParams),
}

impl Action {
	pub fn action_type(&self) -> ActionType {
		match self {
			Action::Swap(_) => ActionType::Swap,
			Action::Bridge(_) => ActionType::Bridge,
			Action::AddLiquidity(_) => ActionType::AddLiquidity,
			Action::CreateChannel(_) => ActionType::CreateChannel,
			Action::CloseChannel(_) => ActionType::CloseChannel,
			Action::Approve(_) => ActionType::Approve,
			Action::Transfer(_) => ActionType::Transfer,
		}
	}

	/// Chain the action's transactions are sent on
	pub fn chain_id(&self) -> u64 {
		match self {
			Action::Swap(p) => p.chain_id,
			Action::Bridge(p) => p.from_chain,
			Action::AddLiquidity(p) => p.chain_id,
			Action::CreateChannel(p) => p.chain_id,
			Action::CloseChannel(p) => p.chain_id,
			Action::Approve(p) => p.chain_id,
			Action::Transfer(p) => p.chain_id,
		}
	}

	/// Provider-built transaction attached to the action, if any
	pub fn transaction(&self) -> Option<&TxRequest> {
		match self {
			Action::Swap(p) => p.transaction.as_ref(),
			Action::Bridge(p) => p.transaction.as_ref(),
			Action::AddLiquidity(p) => p.transaction.as_ref(),
			Action::CreateChannel(p) => p.transaction.as_ref(),
			Action::CloseChannel(p) => p.transaction.as_ref(),
			Action::Approve(_) | Action::Transfer(_) => None,
		}
	}

	pub fn params_value(&self) -> Value {
		serde_json::to_value(self)
			.ok()
			.and_then(|mut v| v.get_mut("params").map(Value::take))
			.unwrap_or(Value::Null)
	}

	/// Build an action from a type and a params object
	pub fn from_params(action_type: ActionType, params: Value) -> Result<Self, ActionError> {
		let mut envelope = Map::new();
		envelope.insert("type".to_string(), Value::String(action_type.as_str().to_string()));
		envelope.insert("params".to_string(), params);
		serde_json::from_value(Value::Object(envelope)).map_err(|e| ActionError::InvalidParams {
			action_type,
			reason: e.to_string(),
		})
	}

	/// Check the registry's required params before the action is resolved to a payload
	pub fn validate_for_execution(&self) -> Result<(), ActionError> {
		let action_type = self.action_type();
		let params = self.params_value();
		for param in action_definition(action_type).required {
			match params.get(*param) {
				None | Some(Value::Null) => {
					return Err(ActionError::MissingParam {
						action_type,
						param: param.to_string(),
					})
				},
				Some(Value::String(s)) if param.starts_with("amount") && s == "0" => {
					return Err(ActionError::NonPositive {
						action_type,
						param: param.to_string(),
					})
				},
				Some(_) => {},
			}
		}
		Ok(())
	}
}

/// Merge the type's defaults with `overrides` (shallow, by top-level key)
pub fn create_action(
	action_type: ActionType,
	overrides: Option<Value>,
) -> Result<Action, ActionError> {
	let mut params = match action_definition(action_type).default_params() {
		Value::Object(map) => map,
		_ => Map::new(),
	};

	match overrides {
		None | Some(Value::Null) => {},
		Some(Value::Object(overrides)) => params.extend(overrides),
		Some(_) => return Err(ActionError::InvalidOverrides { action_type }),
	}

	Action::from_params(action_type, Value::Object(params))
}
