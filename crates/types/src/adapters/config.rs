//! Runtime configuration handed to each adapter

use crate::models::SecretString;
use std::collections::HashMap;

pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 15_000;

/// Minimal runtime configuration needed by adapters
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
	/// Adapter id used in logs, errors and route `provider` fields
	pub provider_id: String,

	/// Base URL without trailing slash
	pub base_url: String,

	pub api_key: Option<SecretString>,

	/// Extra headers sent with every request
	pub headers: HashMap<String, String>,

	/// Per-request timeout in milliseconds
	pub timeout_ms: u64,
}

impl ProviderConfig {
	pub fn new(provider_id: impl Into<String>, base_url: impl Into<String>) -> Self {
		Self {
			provider_id: provider_id.into(),
			base_url: base_url.into().trim_end_matches('/').to_string(),
			api_key: None,
			headers: HashMap::new(),
			timeout_ms: DEFAULT_PROVIDER_TIMEOUT_MS,
		}
	}

	pub fn with_api_key(mut self, api_key: Option<SecretString>) -> Self {
		self.api_key = api_key.filter(|key| !key.is_empty());
		self
	}

	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());
		self
	}

	pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.timeout_ms = timeout_ms;
		self
	}

	/// `base_url` joined with `path`
	pub fn url(&self, path: &str) -> String {
		format!("{}/{}", self.base_url, path.trim_start_matches('/'))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_url_join() {
		let config = ProviderConfig::new("cctp", "https://iris-api.circle.com/");
		assert_eq!(
			config.url("/v2/burn/USDC/fees/0/6"),
			"https://iris-api.circle.com/v2/burn/USDC/fees/0/6"
		);
	}

	#[test]
	fn test_empty_api_key_dropped() {
		let config = ProviderConfig::new("lifi", "https://li.quest/v1")
			.with_api_key(Some(SecretString::from("")));
		assert!(config.api_key.is_none());
	}
}
