//! In-memory ERC-20 fork backend
//!
//! Each opened fork starts from the backend's seeded balances and keeps its
//! own state, so approvals are visible to later payloads on the same fork
//! only. Understands `approve`, `transfer`, `transferFrom` and CCTP
//! `depositForBurn`; anything else reverts with its selector.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{address, Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};
use async_trait::async_trait;
use serde_json::json;
use usdc_service::simulation::{Fork, ForkBackend};
use usdc_types::{
	ForkMetadata, ForkTarget, GasTotals, SimulatedEvent, SimulationError, SimulationResult,
	SummaryStatus, TxPayload,
};

pub const USDC_MAINNET: Address = address!("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
pub const TOKEN_MESSENGER: Address = address!("0x28b5a0e9c621a5badaa536219b3a228c8168cf5d");

sol! {
	interface IToken {
		function approve(address spender, uint256 amount) external returns (bool);
		function transfer(address to, uint256 amount) external returns (bool);
		function transferFrom(address from, address to, uint256 amount) external returns (bool);

		event Transfer(address indexed from, address indexed to, uint256 value);
		event Approval(address indexed owner, address indexed spender, uint256 value);
	}

	interface IMessenger {
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

pub fn approve_data(spender: Address, amount: u64) -> Bytes {
	IToken::approveCall {
		spender,
		amount: U256::from(amount),
	}
	.abi_encode()
	.into()
}

pub fn transfer_from_data(from: Address, to: Address, amount: u64) -> Bytes {
	IToken::transferFromCall {
		from,
		to,
		amount: U256::from(amount),
	}
	.abi_encode()
	.into()
}

pub fn transfer_topic() -> B256 {
	IToken::Transfer::SIGNATURE_HASH
}

pub fn approval_topic() -> B256 {
	IToken::Approval::SIGNATURE_HASH
}

type Balances = HashMap<(Address, Address), U256>;

#[derive(Clone, Default)]
pub struct Erc20ForkBackend {
	/// (token, holder) -> balance, per chain
	seeds: Arc<Mutex<HashMap<u64, Balances>>>,
	unreachable: Arc<Mutex<Vec<String>>>,
	opened: Arc<AtomicUsize>,
	step_delay_ms: u64,
}

impl Erc20ForkBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_balance(self, chain_id: u64, token: Address, holder: Address, amount: u64) -> Self {
		self.seeds
			.lock()
			.unwrap()
			.entry(chain_id)
			.or_default()
			.insert((token, holder), U256::from(amount));
		self
	}

	/// Forks of this RPC URL fail to open
	pub fn with_unreachable(self, rpc_url: &str) -> Self {
		self.unreachable.lock().unwrap().push(rpc_url.to_string());
		self
	}

	/// Every executed payload takes this long
	pub fn with_step_delay_ms(mut self, delay_ms: u64) -> Self {
		self.step_delay_ms = delay_ms;
		self
	}

	pub fn forks_opened(&self) -> usize {
		self.opened.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ForkBackend for Erc20ForkBackend {
	async fn open(
		&self,
		target: &ForkTarget,
		_block_tag: &str,
	) -> Result<Box<dyn Fork>, SimulationError> {
		self.opened.fetch_add(1, Ordering::SeqCst);
		if self.unreachable.lock().unwrap().contains(&target.rpc_url) {
			return Err(SimulationError::ForkFailed {
				rpc_url: target.rpc_url.clone(),
				chain_id: target.chain_id,
				reason: "connection refused".to_string(),
			});
		}
		let balances = self
			.seeds
			.lock()
			.unwrap()
			.get(&target.chain_id)
			.cloned()
			.unwrap_or_default();
		Ok(Box::new(Erc20Fork {
			metadata: ForkMetadata {
				block_number: 20_000_000 + target.chain_id,
				rpc_url: target.rpc_url.clone(),
				timestamp: 1_750_000_000,
			},
			balances,
			allowances: HashMap::new(),
			step_delay_ms: self.step_delay_ms,
		}))
	}
}

struct Erc20Fork {
	metadata: ForkMetadata,
	balances: Balances,
	/// (token, owner, spender) -> allowance
	allowances: HashMap<(Address, Address, Address), U256>,
	step_delay_ms: u64,
}

impl Erc20Fork {
	fn result(&self, status: SummaryStatus, gas: u64) -> SimulationResult {
		SimulationResult {
			fork_metadata: self.metadata.clone(),
			summary_status: status,
			gas_totals: GasTotals {
				used: gas,
				refund: None,
			},
			revert_reason: None,
			error_selector: None,
			trace: json!({"type": "CALL"}),
			events: vec![],
		}
	}

	fn revert(&self, reason: &str) -> SimulationResult {
		SimulationResult {
			revert_reason: Some(reason.to_string()),
			..self.result(SummaryStatus::Revert, 30_000)
		}
	}

	fn event(token: Address, topic: B256, a: Address, b: Address, value: U256) -> SimulatedEvent {
		SimulatedEvent {
			address: token,
			topics: vec![topic, a.into_word(), b.into_word()],
			data: Bytes::from(value.to_be_bytes::<32>().to_vec()),
			signature: None,
		}
	}

	fn balance(&self, token: Address, holder: Address) -> U256 {
		self.balances
			.get(&(token, holder))
			.copied()
			.unwrap_or_default()
	}

	fn move_tokens(
		&mut self,
		token: Address,
		from: Address,
		to: Address,
		amount: U256,
	) -> Result<SimulatedEvent, &'static str> {
		let balance = self.balance(token, from);
		if balance < amount {
			return Err("ERC20: transfer amount exceeds balance");
		}
		self.balances.insert((token, from), balance - amount);
		*self.balances.entry((token, to)).or_default() += amount;
		Ok(Self::event(
			token,
			IToken::Transfer::SIGNATURE_HASH,
			from,
			to,
			amount,
		))
	}

	fn spend_allowance(
		&mut self,
		token: Address,
		owner: Address,
		spender: Address,
		amount: U256,
	) -> Result<(), &'static str> {
		let allowance = self
			.allowances
			.get(&(token, owner, spender))
			.copied()
			.unwrap_or_default();
		if allowance < amount {
			return Err("ERC20: insufficient allowance");
		}
		self.allowances
			.insert((token, owner, spender), allowance - amount);
		Ok(())
	}

	fn apply(&mut self, payload: &TxPayload) -> SimulationResult {
		let Some(to) = payload.to else {
			return self.revert("contract creation not supported");
		};
		let data = payload.data.clone().unwrap_or_default();
		let sender = payload.from;

		if let Ok(call) = IToken::approveCall::abi_decode(&data) {
			self.allowances
				.insert((to, sender, call.spender), call.amount);
			let mut result = self.result(SummaryStatus::Success, 46_000);
			result.events.push(Self::event(
				to,
				IToken::Approval::SIGNATURE_HASH,
				sender,
				call.spender,
				call.amount,
			));
			return result;
		}

		let outcome = if let Ok(call) = IToken::transferCall::abi_decode(&data) {
			self.move_tokens(to, sender, call.to, call.amount)
		} else if let Ok(call) = IToken::transferFromCall::abi_decode(&data) {
			self.spend_allowance(to, call.from, sender, call.amount)
				.and_then(|_| self.move_tokens(to, call.from, call.to, call.amount))
		} else if let Ok(call) = IMessenger::depositForBurnCall::abi_decode(&data) {
			if to != TOKEN_MESSENGER {
				return self.revert("not a token messenger");
			}
			self.spend_allowance(call.burnToken, sender, to, call.amount)
				.and_then(|_| self.move_tokens(call.burnToken, sender, Address::ZERO, call.amount))
		} else {
			let mut result = self.result(SummaryStatus::Revert, 21_000);
			result.error_selector = data.get(..4).map(|s| format!("0x{}", alloy_primitives::hex::encode(s)));
			return result;
		};

		match outcome {
			Ok(event) => {
				let mut result = self.result(SummaryStatus::Success, 52_000);
				result.events.push(event);
				result
			},
			Err(reason) => self.revert(reason),
		}
	}
}

#[async_trait]
impl Fork for Erc20Fork {
	fn metadata(&self) -> &ForkMetadata {
		&self.metadata
	}

	async fn execute(&mut self, payload: &TxPayload) -> Result<SimulationResult, SimulationError> {
		if self.step_delay_ms > 0 {
			tokio::time::sleep(Duration::from_millis(self.step_delay_ms)).await;
		}
		Ok(self.apply(payload))
	}
}
