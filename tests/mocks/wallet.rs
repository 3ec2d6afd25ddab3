//! Scripted EIP-1193 wallet

use std::sync::Mutex;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use serde_json::{json, Value};
use usdc_types::models::parse_chain_id;
use usdc_types::WalletError;

/// Wallet connected to `accounts` on `chain_id`
///
/// Chain switches are honoured, `reject_at` rejects the n-th send (0-based)
/// and every accepted transaction request is recorded.
pub struct MockWallet {
	accounts: Vec<Address>,
	chain_id: Mutex<u64>,
	reject_at: Option<usize>,
	sent: Mutex<Vec<Value>>,
	requests: Mutex<Vec<String>>,
}

impl MockWallet {
	pub fn new(account: Address, chain_id: u64) -> Self {
		Self {
			accounts: vec![account],
			chain_id: Mutex::new(chain_id),
			reject_at: None,
			sent: Mutex::new(vec![]),
			requests: Mutex::new(vec![]),
		}
	}

	pub fn rejecting_at(mut self, index: usize) -> Self {
		self.reject_at = Some(index);
		self
	}

	pub fn sent(&self) -> Vec<Value> {
		self.sent.lock().unwrap().clone()
	}

	pub fn requests(&self) -> Vec<String> {
		self.requests.lock().unwrap().clone()
	}
}

#[async_trait]
impl usdc_types::Eip1193Provider for MockWallet {
	async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
		self.requests.lock().unwrap().push(method.to_string());
		match method {
			"eth_requestAccounts" | "eth_accounts" => Ok(json!(self.accounts)),
			"eth_chainId" => Ok(json!(format!("0x{:x}", *self.chain_id.lock().unwrap()))),
			"wallet_switchEthereumChain" => {
				let requested = params[0]["chainId"]
					.as_str()
					.and_then(parse_chain_id)
					.ok_or_else(|| WalletError::new(-32602, "invalid chainId"))?;
				*self.chain_id.lock().unwrap() = requested;
				Ok(Value::Null)
			},
			"eth_sendTransaction" => {
				let mut sent = self.sent.lock().unwrap();
				if self.reject_at == Some(sent.len()) {
					return Err(WalletError::user_rejected());
				}
				sent.push(params[0].clone());
				Ok(json!(B256::repeat_byte(sent.len() as u8)))
			},
			_ => Err(WalletError::new(4200, format!("unsupported method {}", method))),
		}
	}
}
