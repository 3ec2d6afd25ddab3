//! Transferable asset configuration and amount bounds

use super::Amount;
use alloy_primitives::{Address, I256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Asset that routes can be requested for, with its configured amount range
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetConfig {
	/// Token symbol (e.g., "USDC")
	pub symbol: String,
	/// Number of decimal places
	pub decimals: u8,
	/// Smallest accepted amount in smallest units
	pub min_amount: Amount,
	/// Largest accepted amount in smallest units
	pub max_amount: Amount,
	/// Token contract per chain id
	#[serde(default)]
	pub addresses: BTreeMap<u64, Address>,
}

/// Reason an amount failed validation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AmountValidationError {
	Invalid,
	TooLow,
	TooHigh,
}

/// Outcome of validating an amount against an asset's bounds
///
/// `min_amount` / `max_amount` are human-unit strings and only populated for
/// the bound that was violated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AmountValidation {
	pub is_valid: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<AmountValidationError>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub min_amount: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_amount: Option<String>,
}

impl AmountValidation {
	pub fn valid() -> Self {
		Self {
			is_valid: true,
			error: None,
			min_amount: None,
			max_amount: None,
		}
	}

	fn failed(error: AmountValidationError) -> Self {
		Self {
			is_valid: false,
			error: Some(error),
			min_amount: None,
			max_amount: None,
		}
	}
}

impl AssetConfig {
	/// USDC with 6 decimals, 1 USDC minimum and 1M USDC maximum
	pub fn usdc() -> Self {
		let addresses = [
			(1, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
			(10, "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85"),
			(137, "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359"),
			(8453, "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
			(42161, "0xaf88d065e77c8cC2239327C5EDb3A432268e5831"),
			(43114, "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"),
		]
		.into_iter()
		.filter_map(|(chain_id, address)| address.parse().ok().map(|a| (chain_id, a)))
		.collect();

		Self {
			symbol: "USDC".to_string(),
			decimals: 6,
			min_amount: Amount::from(1_000_000u64),
			max_amount: Amount::from(1_000_000_000_000u64),
			addresses,
		}
	}

	pub fn address_on(&self, chain_id: u64) -> Option<Address> {
		self.addresses.get(&chain_id).copied()
	}

	/// Check a signed amount against `[min_amount, max_amount]`
	pub fn validate_amount(&self, amount: I256) -> AmountValidation {
		if amount <= I256::ZERO {
			return AmountValidation::failed(AmountValidationError::Invalid);
		}

		let amount = Amount::new(amount.into_raw());
		if amount < self.min_amount {
			return AmountValidation {
				min_amount: Some(self.min_amount.format_units(self.decimals)),
				..AmountValidation::failed(AmountValidationError::TooLow)
			};
		}
		if amount > self.max_amount {
			return AmountValidation {
				max_amount: Some(self.max_amount.format_units(self.decimals)),
				..AmountValidation::failed(AmountValidationError::TooHigh)
			};
		}

		AmountValidation::valid()
	}
}
