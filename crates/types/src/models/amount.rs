//! Arbitrary-precision token amounts
//!
//! Amounts are always held in the asset's smallest unit. Provider payloads
//! carry them as decimal strings, hex strings or JSON integers; all of those
//! are converted here and never pass through floating point.

use alloy_primitives::U256;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while converting a provider or user value into an [`Amount`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountParseError {
	#[error("amount value cannot be empty")]
	Empty,

	#[error("amount contains invalid digits: {0}")]
	InvalidDigits(String),

	#[error("amount cannot be negative: {0}")]
	Negative(String),

	#[error("amount overflows 256 bits: {0}")]
	Overflow(String),

	#[error("amount is not an integer: {0}")]
	NonInteger(String),

	#[error("unexpected JSON type for amount: {0}")]
	UnexpectedType(String),
}

/// Token amount in smallest units, serialized as a decimal string
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(pub U256);

impl Amount {
	pub const ZERO: Self = Self(U256::ZERO);

	pub fn new(value: U256) -> Self {
		Self(value)
	}

	pub fn as_u256(&self) -> U256 {
		self.0
	}

	pub fn is_zero(&self) -> bool {
		self.0.is_zero()
	}

	pub fn checked_add(self, other: Self) -> Option<Self> {
		self.0.checked_add(other.0).map(Self)
	}

	pub fn saturating_sub(self, other: Self) -> Self {
		Self(self.0.saturating_sub(other.0))
	}

	/// Convert a provider JSON value (string or integer number) into an amount
	pub fn from_provider_value(value: &serde_json::Value) -> Result<Self, AmountParseError> {
		match value {
			serde_json::Value::String(s) => s.parse(),
			serde_json::Value::Number(n) => n
				.as_u64()
				.map(|v| Self(U256::from(v)))
				.ok_or_else(|| {
					if n.as_i64().is_some_and(|v| v < 0) {
						AmountParseError::Negative(n.to_string())
					} else {
						AmountParseError::NonInteger(n.to_string())
					}
				}),
			other => Err(AmountParseError::UnexpectedType(other.to_string())),
		}
	}

	/// Parse a human decimal ("12.5") into smallest units for the given decimals.
	///
	/// Digits beyond `decimals` are truncated toward zero.
	pub fn from_decimal_units(value: &str, decimals: u8) -> Result<Self, AmountParseError> {
		let value = value.trim();
		if value.is_empty() {
			return Err(AmountParseError::Empty);
		}
		if value.starts_with('-') {
			return Err(AmountParseError::Negative(value.to_string()));
		}

		let (whole, fraction) = match value.split_once('.') {
			Some((whole, fraction)) => (whole, fraction),
			None => (value, ""),
		};
		let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
		if !all_digits(whole) || !all_digits(fraction) || (whole.is_empty() && fraction.is_empty())
		{
			return Err(AmountParseError::InvalidDigits(value.to_string()));
		}

		let scale = pow10(decimals);
		let overflow = || AmountParseError::Overflow(value.to_string());

		let whole_units = if whole.is_empty() {
			U256::ZERO
		} else {
			U256::from_str_radix(whole, 10).map_err(|_| overflow())?
		};

		let mut fraction_digits: String = fraction.chars().take(decimals as usize).collect();
		while fraction_digits.len() < decimals as usize {
			fraction_digits.push('0');
		}
		let fraction_units = if fraction_digits.is_empty() {
			U256::ZERO
		} else {
			U256::from_str_radix(&fraction_digits, 10).map_err(|_| overflow())?
		};

		whole_units
			.checked_mul(scale)
			.and_then(|v| v.checked_add(fraction_units))
			.map(Self)
			.ok_or_else(overflow)
	}

	/// Format in human units, trimming trailing fractional zeros ("1", "12.5")
	pub fn format_units(&self, decimals: u8) -> String {
		let scale = pow10(decimals);
		let whole = self.0 / scale;
		let remainder = self.0 % scale;
		if remainder.is_zero() {
			return whole.to_string();
		}

		let fraction = format!("{:0>width$}", remainder.to_string(), width = decimals as usize);
		format!("{}.{}", whole, fraction.trim_end_matches('0'))
	}
}

fn pow10(decimals: u8) -> U256 {
	U256::from(10u64).pow(U256::from(decimals))
}

impl fmt::Display for Amount {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for Amount {
	type Err = AmountParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.is_empty() {
			return Err(AmountParseError::Empty);
		}
		if s.starts_with('-') {
			return Err(AmountParseError::Negative(s.to_string()));
		}
		let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
			Some(hex) => (hex, 16),
			None => {
				if s.contains('.') || s.contains('e') || s.contains('E') {
					return Err(AmountParseError::NonInteger(s.to_string()));
				}
				(s, 10)
			},
		};
		if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
			return Err(AmountParseError::InvalidDigits(s.to_string()));
		}

		// Digits are validated above, so any remaining failure is overflow
		U256::from_str_radix(digits, radix as u64)
			.map(Self)
			.map_err(|_| AmountParseError::Overflow(s.to_string()))
	}
}

impl From<U256> for Amount {
	fn from(value: U256) -> Self {
		Self(value)
	}
}

impl From<u64> for Amount {
	fn from(value: u64) -> Self {
		Self(U256::from(value))
	}
}

impl From<u128> for Amount {
	fn from(value: u128) -> Self {
		Self(U256::from(value))
	}
}

impl From<Amount> for U256 {
	fn from(value: Amount) -> Self {
		value.0
	}
}

impl Serialize for Amount {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.0.to_string())
	}
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
	type Value = Amount;

	fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
		formatter.write_str("a non-negative integer or integer string")
	}

	fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
	where
		E: de::Error,
	{
		v.parse().map_err(de::Error::custom)
	}

	fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
	where
		E: de::Error,
	{
		Ok(Amount::from(v))
	}

	fn visit_u128<E>(self, v: u128) -> Result<Self::Value, E>
	where
		E: de::Error,
	{
		Ok(Amount::from(v))
	}

	fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
	where
		E: de::Error,
	{
		u64::try_from(v)
			.map(Amount::from)
			.map_err(|_| de::Error::custom(AmountParseError::Negative(v.to_string())))
	}
}

impl<'de> Deserialize<'de> for Amount {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		deserializer.deserialize_any(AmountVisitor)
	}
}
