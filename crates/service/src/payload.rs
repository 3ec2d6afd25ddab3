//! Turning session actions into raw transactions
//!
//! ERC-20 and CCTP actions are encoded locally. Actions whose calldata only a
//! provider can build (swaps, liquidity, channels, non-CCTP bridges) must carry
//! the provider's `transaction`.

use alloy_primitives::{address, Address, B256, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use thiserror::Error;
use usdc_types::actions::{BridgeParams, BridgeProtocol};
use usdc_types::models::circle_domain;
use usdc_types::{
	Action, ActionError, ActionType, Amount, AssetConfig, SessionParams, TxPayload, TxRequest,
};

/// CCTP v2 TokenMessenger, same address on every supported EVM chain
pub const TOKEN_MESSENGER_V2: Address = address!("0x28b5a0e9c621a5badaa536219b3a228c8168cf5d");

/// `minFinalityThreshold` for fast transfers
pub const FAST_FINALITY_THRESHOLD: u32 = 1000;

sol! {
	interface IERC20 {
		function approve(address spender, uint256 amount) external returns (bool);
		function transfer(address to, uint256 amount) external returns (bool);
		function transferFrom(address from, address to, uint256 amount) external returns (bool);
	}

	interface ITokenMessengerV2 {
		function depositForBurn(
			uint256 amount,
			uint32 destinationDomain,
			bytes32 mintRecipient,
			address burnToken,
			bytes32 destinationCaller,
			uint256 maxFee,
			uint32 minFinalityThreshold
		) external;
	}
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
	#[error(transparent)]
	Action(#[from] ActionError),

	#[error("{0} needs a provider-built transaction")]
	NoTransaction(ActionType),

	#[error("{action_type} is not available on chain {chain_id}")]
	UnsupportedChain {
		action_type: ActionType,
		chain_id: u64,
	},

	#[error("session has no owner to send {0} from")]
	MissingOwner(ActionType),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionResolver: Send + Sync {
	/// Transactions for one action, in the order they must be sent
	async fn resolve(
		&self,
		action: &Action,
		params: &SessionParams,
	) -> Result<Vec<TxRequest>, PayloadError>;
}

/// Resolver that needs no network access
#[derive(Debug, Clone)]
pub struct StaticActionResolver {
	usdc: AssetConfig,
}

impl Default for StaticActionResolver {
	fn default() -> Self {
		Self::new(AssetConfig::usdc())
	}
}

fn amount(value: Amount) -> U256 {
	value.as_u256()
}

impl StaticActionResolver {
	pub fn new(usdc: AssetConfig) -> Self {
		Self { usdc }
	}

	fn tx(chain_id: u64, from: Option<Address>, to: Address, data: Vec<u8>) -> TxRequest {
		TxRequest {
			chain_id,
			from,
			to,
			data: data.into(),
			value: Amount::ZERO,
			gas_limit: None,
		}
	}

	fn cctp_burn(
		&self,
		p: &BridgeParams,
		owner: Option<Address>,
	) -> Result<Vec<TxRequest>, PayloadError> {
		let unsupported = |chain_id| PayloadError::UnsupportedChain {
			action_type: ActionType::Bridge,
			chain_id,
		};
		let token = p
			.token
			.or_else(|| self.usdc.address_on(p.from_chain))
			.ok_or_else(|| unsupported(p.from_chain))?;
		circle_domain(p.from_chain).ok_or_else(|| unsupported(p.from_chain))?;
		let destination = circle_domain(p.to_chain).ok_or_else(|| unsupported(p.to_chain))?;
		let recipient = p
			.recipient
			.or(owner)
			.ok_or(PayloadError::MissingOwner(ActionType::Bridge))?;

		let approve = IERC20::approveCall {
			spender: TOKEN_MESSENGER_V2,
			amount: amount(p.amount),
		};
		let burn = ITokenMessengerV2::depositForBurnCall {
			amount: amount(p.amount),
			destinationDomain: destination,
			mintRecipient: recipient.into_word(),
			burnToken: token,
			destinationCaller: B256::ZERO,
			maxFee: amount(p.max_fee),
			minFinalityThreshold: p.min_finality_threshold,
		};

		Ok(vec![
			Self::tx(p.from_chain, owner, token, approve.abi_encode()),
			Self::tx(p.from_chain, owner, TOKEN_MESSENGER_V2, burn.abi_encode()),
		])
	}
}

#[async_trait]
impl ActionResolver for StaticActionResolver {
	async fn resolve(
		&self,
		action: &Action,
		params: &SessionParams,
	) -> Result<Vec<TxRequest>, PayloadError> {
		action.validate_for_execution()?;
		let owner = params.owner;
		let missing = |param: &str| ActionError::MissingParam {
			action_type: action.action_type(),
			param: param.to_string(),
		};

		match action {
			Action::Approve(p) => {
				let token = p.token.ok_or_else(|| missing("token"))?;
				let call = IERC20::approveCall {
					spender: p.spender.ok_or_else(|| missing("spender"))?,
					amount: amount(p.amount),
				};
				Ok(vec![Self::tx(p.chain_id, owner, token, call.abi_encode())])
			},
			Action::Transfer(p) => {
				let token = p.token.ok_or_else(|| missing("token"))?;
				let to = p.recipient.ok_or_else(|| missing("recipient"))?;
				let data = match p.from {
					Some(from) => IERC20::transferFromCall {
						from,
						to,
						amount: amount(p.amount),
					}
					.abi_encode(),
					None => IERC20::transferCall {
						to,
						amount: amount(p.amount),
					}
					.abi_encode(),
				};
				Ok(vec![Self::tx(p.chain_id, owner, token, data)])
			},
			Action::Bridge(p) => match (&p.transaction, p.protocol) {
				(Some(tx), _) => Ok(vec![tx.clone()]),
				(None, BridgeProtocol::Cctp) => self.cctp_burn(p, owner),
				(None, _) => Err(PayloadError::NoTransaction(ActionType::Bridge)),
			},
			other => other
				.transaction()
				.map(|tx| vec![tx.clone()])
				.ok_or(PayloadError::NoTransaction(other.action_type())),
		}
	}
}

/// Simulation request for `tx` sent by `from`
pub fn simulation_payload(tx: &TxRequest, from: Address, rpc_url: &str) -> TxPayload {
	TxPayload {
		rpc_url: rpc_url.to_string(),
		chain_id: tx.chain_id,
		from: tx.from.unwrap_or(from),
		to: Some(tx.to),
		data: (!tx.data.is_empty()).then(|| tx.data.clone()),
		value: (!tx.value.is_zero()).then(|| tx.value.as_u256()),
		gas_limit: tx.gas_limit,
		block_tag: None,
	}
}
