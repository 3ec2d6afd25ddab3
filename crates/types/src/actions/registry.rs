//! Action type registry: label, required params and default payload per type

use super::{
	ActionType, AddLiquidityParams, ApproveParams, BridgeParams, CloseChannelParams,
	CreateChannelParams, SwapParams, TransferParams,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
	pub action_type: ActionType,
	pub label: &'static str,
	pub description: &'static str,
	/// camelCase param names that must be set before execution
	pub required: &'static [&'static str],
}

pub const ACTION_DEFINITIONS: &[ActionDefinition] = &[
	ActionDefinition {
		action_type: ActionType::Swap,
		label: "Swap",
		description: "Exchange one token for another on a single chain",
		required: &["tokenIn", "tokenOut", "amountIn"],
	},
	ActionDefinition {
		action_type: ActionType::Bridge,
		label: "Bridge",
		description: "Move USDC to another chain",
		required: &["amount"],
	},
	ActionDefinition {
		action_type: ActionType::AddLiquidity,
		label: "Add liquidity",
		description: "Provide liquidity to a Uniswap v4 pool",
		required: &["token0", "token1", "amount0"],
	},
	ActionDefinition {
		action_type: ActionType::CreateChannel,
		label: "Open channel",
		description: "Fund a state channel with a counterparty",
		required: &["counterparty", "token", "amount"],
	},
	ActionDefinition {
		action_type: ActionType::CloseChannel,
		label: "Close channel",
		description: "Settle and close an open state channel",
		required: &["channelId"],
	},
	ActionDefinition {
		action_type: ActionType::Approve,
		label: "Approve",
		description: "Set a token allowance for a spender",
		required: &["token", "spender"],
	},
	ActionDefinition {
		action_type: ActionType::Transfer,
		label: "Transfer",
		description: "Send tokens to an address",
		required: &["token", "recipient", "amount"],
	},
];

/// Every [`ActionType`] has exactly one definition
pub fn action_definition(action_type: ActionType) -> &'static ActionDefinition {
	// ACTION_DEFINITIONS is ordered like ActionType::ALL
	&ACTION_DEFINITIONS[action_type as usize]
}

impl ActionDefinition {
	pub fn default_params(&self) -> Value {
		let params = match self.action_type {
			ActionType::Swap => serde_json::to_value(SwapParams::default()),
			ActionType::Bridge => serde_json::to_value(BridgeParams::default()),
			ActionType::AddLiquidity => serde_json::to_value(AddLiquidityParams::default()),
			ActionType::CreateChannel => serde_json::to_value(CreateChannelParams::default()),
			ActionType::CloseChannel => serde_json::to_value(CloseChannelParams::default()),
			ActionType::Approve => serde_json::to_value(ApproveParams::default()),
			ActionType::Transfer => serde_json::to_value(TransferParams::default()),
		};
		params.unwrap_or(Value::Null)
	}
}
