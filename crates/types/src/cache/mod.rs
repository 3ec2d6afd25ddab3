//! Keyed async cache row types
//!
//! The store itself lives in `usdc-storage`; these are the shapes readers see.

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// One cache entry with its loading/error state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheRow<T, E = String> {
	pub key: String,
	pub data: Option<T>,
	pub is_loading: bool,
	pub error: Option<E>,
	/// Time of the last successful resolution
	pub fetched_at: Option<DateTime<Utc>>,
	/// Generation of the fetch that last touched this row
	pub generation: u64,
}

impl<T, E> CacheRow<T, E> {
	pub fn loading(key: String, placeholder: Option<T>, generation: u64) -> Self {
		Self {
			key,
			data: placeholder,
			is_loading: true,
			error: None,
			fetched_at: None,
			generation,
		}
	}

	pub fn resolved(key: String, data: T, generation: u64) -> Self {
		Self {
			key,
			data: Some(data),
			is_loading: false,
			error: None,
			fetched_at: Some(Utc::now()),
			generation,
		}
	}

	pub fn has_data(&self) -> bool {
		self.data.is_some()
	}

	/// Settled with an error (data may still hold the previous value)
	pub fn is_error(&self) -> bool {
		!self.is_loading && self.error.is_some()
	}
}

/// Proof that a fetch was started; resolutions carrying an outdated ticket are discarded
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTicket {
	pub key: String,
	pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheEventKind {
	Loading,
	Resolved,
	Rejected,
	Removed,
}

/// Broadcast to subscribers on every write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
	pub key: String,
	pub generation: u64,
	pub kind: CacheEventKind,
}

/// Builds `prefix:seg:seg` keys with lower-cased segments
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
	key: String,
}

impl CacheKeyBuilder {
	pub fn new(prefix: &str) -> Self {
		Self {
			key: prefix.to_lowercase(),
		}
	}

	pub fn segment(mut self, value: impl Display) -> Self {
		self.key.push(':');
		self.key.push_str(&value.to_string().to_lowercase());
		self
	}

	pub fn address(self, address: &Address) -> Self {
		self.segment(address)
	}

	pub fn optional(self, value: Option<impl Display>) -> Self {
		match value {
			Some(value) => self.segment(value),
			None => self.segment("-"),
		}
	}

	pub fn build(self) -> String {
		self.key
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_key_builder_lowercases() {
		let key = CacheKeyBuilder::new("Fees")
			.segment(0)
			.segment("USDC")
			.optional(None::<u64>)
			.build();
		assert_eq!(key, "fees:0:usdc:-");
	}

	#[test]
	fn test_row_states() {
		let row: CacheRow<u32> = CacheRow::loading("k".to_string(), None, 1);
		assert!(row.is_loading);
		assert!(!row.has_data());
		assert!(!row.is_error());

		let row: CacheRow<u32> = CacheRow::resolved("k".to_string(), 7, 2);
		assert_eq!(row.data, Some(7));
		assert!(row.fetched_at.is_some());
	}
}
