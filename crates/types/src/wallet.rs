//! EIP-1193 wallet boundary
//!
//! The wallet is an injected capability. The router never signs anything itself,
//! it only issues `request` calls and interprets the results.

use crate::models::parse_chain_id;
use crate::routes::TxRequest;
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub const USER_REJECTED_CODE: i64 = 4001;
pub const DISCONNECTED_CODE: i64 = 4900;
pub const CHAIN_DISCONNECTED_CODE: i64 = 4901;

/// Error object returned by a provider `request`
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[error("wallet request failed ({code}): {message}")]
pub struct WalletError {
	pub code: i64,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

impl WalletError {
	pub fn new(code: i64, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
			data: None,
		}
	}

	pub fn user_rejected() -> Self {
		Self::new(USER_REJECTED_CODE, "User rejected the request.")
	}

	pub fn invalid_response(method: &str, value: &Value) -> Self {
		Self::new(-32603, format!("unexpected {} response: {}", method, value))
	}
}

/// `request({method, params})` of an EIP-1193 provider
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
	async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError>;
}

/// Connected accounts, prompting the user if needed
pub async fn request_accounts(wallet: &dyn Eip1193Provider) -> Result<Vec<Address>, WalletError> {
	let value = wallet.request("eth_requestAccounts", json!([])).await?;
	serde_json::from_value::<Vec<Address>>(value.clone())
		.map_err(|_| WalletError::invalid_response("eth_requestAccounts", &value))
}

pub async fn chain_id(wallet: &dyn Eip1193Provider) -> Result<u64, WalletError> {
	let value = wallet.request("eth_chainId", json!([])).await?;
	value
		.as_str()
		.and_then(parse_chain_id)
		.or_else(|| value.as_u64())
		.ok_or_else(|| WalletError::invalid_response("eth_chainId", &value))
}

/// Ask the wallet to sign and broadcast; returns the transaction hash
pub async fn send_transaction(
	wallet: &dyn Eip1193Provider,
	from: Address,
	tx: &TxRequest,
) -> Result<B256, WalletError> {
	let mut request = json!({
		"from": from,
		"to": tx.to,
		"data": tx.data,
		"value": format!("0x{:x}", tx.value.as_u256()),
		"chainId": format!("0x{:x}", tx.chain_id),
	});
	if let Some(gas) = tx.gas_limit {
		request["gas"] = Value::String(format!("0x{:x}", gas));
	}

	let value = wallet.request("eth_sendTransaction", json!([request])).await?;
	serde_json::from_value::<B256>(value.clone())
		.map_err(|_| WalletError::invalid_response("eth_sendTransaction", &value))
}

pub async fn personal_sign(
	wallet: &dyn Eip1193Provider,
	account: Address,
	message: &[u8],
) -> Result<Bytes, WalletError> {
	let message = Bytes::copy_from_slice(message);
	let value = wallet
		.request("personal_sign", json!([message, account]))
		.await?;
	serde_json::from_value::<Bytes>(value.clone())
		.map_err(|_| WalletError::invalid_response("personal_sign", &value))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::errors::{classify, ErrorKind};
	use crate::models::Amount;
	use std::sync::Mutex;

	#[derive(Default)]
	struct RecordingWallet {
		calls: Mutex<Vec<(String, Value)>>,
	}

	#[async_trait]
	impl Eip1193Provider for RecordingWallet {
		async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
			self.calls
				.lock()
				.unwrap()
				.push((method.to_string(), params.clone()));
			match method {
				"eth_requestAccounts" => Ok(json!(["0x000000000000000000000000000000000000dead"])),
				"eth_chainId" => Ok(json!("0x2105")),
				"eth_sendTransaction" => Ok(json!(format!("0x{}", "ab".repeat(32)))),
				"personal_sign" => Err(WalletError::user_rejected()),
				_ => Err(WalletError::new(4200, "unsupported method")),
			}
		}
	}

	#[tokio::test]
	async fn test_helpers_decode_responses() {
		let wallet = RecordingWallet::default();
		let accounts = request_accounts(&wallet).await.unwrap();
		assert_eq!(accounts.len(), 1);
		assert_eq!(chain_id(&wallet).await.unwrap(), 8453);

		let tx = TxRequest {
			chain_id: 8453,
			from: None,
			to: accounts[0],
			data: Bytes::from(vec![0x12, 0x34]),
			value: Amount::from(16u64),
			gas_limit: Some(21_000),
		};
		let hash = send_transaction(&wallet, accounts[0], &tx).await.unwrap();
		assert_eq!(hash, B256::repeat_byte(0xab));

		let calls = wallet.calls.lock().unwrap();
		let (method, params) = &calls[2];
		assert_eq!(method, "eth_sendTransaction");
		assert_eq!(params[0]["value"], "0x10");
		assert_eq!(params[0]["gas"], "0x5208");
		assert_eq!(params[0]["chainId"], "0x2105");
		assert_eq!(params[0]["data"], "0x1234");
	}

	#[tokio::test]
	async fn test_rejection_classifies_as_user_rejected() {
		let wallet = RecordingWallet::default();
		let err = personal_sign(&wallet, Address::ZERO, b"hello")
			.await
			.unwrap_err();
		assert_eq!(err.code, USER_REJECTED_CODE);
		assert_eq!(classify(&err).code, ErrorKind::UserRejected);

		let disconnected = WalletError::new(DISCONNECTED_CODE, "Provider is disconnected");
		assert_eq!(classify(&disconnected).code, ErrorKind::WalletDisconnected);
	}
}
