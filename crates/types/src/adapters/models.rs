//! Normalized provider models
//!
//! Every amount here is an [`Amount`] in smallest units; provider JSON never
//! leaves the adapter that parsed it.

use crate::models::Amount;
use crate::routes::TxRequest;
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// CCTP finality thresholds
pub const FAST_FINALITY_THRESHOLD: u32 = 1000;
pub const STANDARD_FINALITY_THRESHOLD: u32 = 2000;

/// One fee tier from the CCTP fees endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CctpFee {
	pub finality_threshold: u32,
	/// Minimum fee in hundredths of a basis point (1 bps = 100)
	pub minimum_fee_centi_bps: u64,
}

impl CctpFee {
	pub fn is_fast(&self) -> bool {
		self.finality_threshold <= FAST_FINALITY_THRESHOLD
	}

	/// Fee charged on `amount`, rounded up
	pub fn fee_for(&self, amount: Amount) -> Option<Amount> {
		let denominator = U256::from(1_000_000u64);
		amount
			.as_u256()
			.checked_mul(U256::from(self.minimum_fee_centi_bps))?
			.checked_add(denominator - U256::from(1u64))
			.map(|numerator| Amount::new(numerator / denominator))
	}
}

/// Remaining fast-transfer capacity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FastBurnAllowance {
	pub allowance: Amount,
	pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CctpAttestation {
	pub status: String,
	pub message: Option<Bytes>,
	pub attestation: Option<Bytes>,
}

impl CctpAttestation {
	pub fn is_complete(&self) -> bool {
		self.status == "complete" && self.message.is_some() && self.attestation.is_some()
	}
}

/// Unified Gateway balance for one depositor on one domain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayBalance {
	pub domain: u32,
	pub chain_id: Option<u64>,
	pub depositor: Address,
	pub balance: Amount,
}

/// Burn intent signed by the depositor, forwarded to Gateway as-is
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignedBurnIntent {
	pub burn_intent: serde_json::Value,
	pub signature: Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayAttestation {
	pub transfer_id: Option<String>,
	pub attestation: Bytes,
	pub signature: Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UniswapPool {
	pub id: String,
	pub chain_id: u64,
	pub token0: Address,
	pub token1: Address,
	pub fee_tier: u32,
	pub liquidity: Amount,
	pub sqrt_price: Amount,
	pub tick: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UniswapPosition {
	pub id: String,
	pub chain_id: u64,
	pub token_id: Amount,
	pub owner: Address,
	pub pool_id: Option<String>,
	pub tick_lower: Option<i32>,
	pub tick_upper: Option<i32>,
	pub liquidity: Option<Amount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuoteRequest {
	pub chain_id: u64,
	pub sell_token: Address,
	pub buy_token: Address,
	pub sell_amount: Amount,
	pub taker: Address,
	pub slippage_bps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
	pub provider: String,
	pub chain_id: u64,
	pub sell_token: Address,
	pub buy_token: Address,
	pub sell_amount: Amount,
	pub buy_amount: Amount,
	pub min_buy_amount: Amount,
	pub gas_estimate: Option<u64>,
	pub transaction: Option<TxRequest>,
}

/// Cross-chain transfer status as tracked by a provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferStatus {
	/// NOT_FOUND, INVALID, PENDING, DONE or FAILED
	pub status: String,
	pub substatus: Option<String>,
	pub sending_tx: Option<B256>,
	pub receiving_tx: Option<B256>,
}

impl TransferStatus {
	pub fn is_final(&self) -> bool {
		matches!(self.status.as_str(), "DONE" | "FAILED" | "INVALID")
	}
}
