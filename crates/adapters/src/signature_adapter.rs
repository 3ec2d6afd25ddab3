//! Function selector and event topic lookups
//!
//! Two public signature databases (4byte.directory and openchain) are queried
//! side by side and their answers merged into one sorted, de-duplicated list.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};
use usdc_types::{AdapterError, AdapterResult, ProviderConfig, SignatureRegistry};

use crate::client_cache::{AuthConfig, ClientCache};
use crate::http::{read_json, read_optional_json, send};

pub const FOURBYTE_API_BASE: &str = "https://www.4byte.directory";
pub const OPENCHAIN_API_BASE: &str = "https://api.openchain.xyz";

fn is_hex_of_len(value: &str, bytes: usize) -> bool {
	value
		.strip_prefix("0x")
		.is_some_and(|hex| hex.len() == bytes * 2 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[derive(Debug, Deserialize)]
struct FourByteResponse {
	#[serde(default)]
	results: Vec<FourByteEntry>,
}

#[derive(Debug, Deserialize)]
struct FourByteEntry {
	text_signature: String,
}

/// 4byte.directory registry
#[derive(Debug)]
pub struct FourByteRegistry {
	config: ProviderConfig,
	cache: ClientCache,
}

impl FourByteRegistry {
	pub fn new(config: ProviderConfig) -> Self {
		Self::with_cache(config, ClientCache::new())
	}

	pub fn with_cache(config: ProviderConfig, cache: ClientCache) -> Self {
		Self { config, cache }
	}

	async fn lookup(&self, path: &str, hex: &str) -> AdapterResult<Vec<String>> {
		let client = self
			.cache
			.get_client_with_auth(&self.config, &AuthConfig::None)?;
		let url = self.config.url(path);
		let request = client.get(&url).query(&[("hex_signature", hex)]);
		let response = send(&self.config, request).await?;
		let parsed = read_optional_json::<FourByteResponse>(&self.config, response).await?;
		Ok(parsed
			.map(|r| r.results.into_iter().map(|e| e.text_signature).collect())
			.unwrap_or_default())
	}
}

#[async_trait]
impl SignatureRegistry for FourByteRegistry {
	fn id(&self) -> &str {
		&self.config.provider_id
	}

	async fn lookup_function(&self, selector: &str) -> AdapterResult<Vec<String>> {
		self.lookup("api/v1/signatures/", selector).await
	}

	async fn lookup_event(&self, topic: &str) -> AdapterResult<Vec<String>> {
		self.lookup("api/v1/event-signatures/", topic).await
	}
}

#[derive(Debug, Deserialize)]
struct OpenChainResponse {
	ok: bool,
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	result: Option<OpenChainResult>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenChainResult {
	#[serde(default)]
	function: HashMap<String, Option<Vec<OpenChainEntry>>>,
	#[serde(default)]
	event: HashMap<String, Option<Vec<OpenChainEntry>>>,
}

#[derive(Debug, Deserialize)]
struct OpenChainEntry {
	name: String,
}

/// openchain.xyz signature database
#[derive(Debug)]
pub struct OpenChainRegistry {
	config: ProviderConfig,
	cache: ClientCache,
}

impl OpenChainRegistry {
	pub fn new(config: ProviderConfig) -> Self {
		Self::with_cache(config, ClientCache::new())
	}

	pub fn with_cache(config: ProviderConfig, cache: ClientCache) -> Self {
		Self { config, cache }
	}

	async fn lookup(&self, kind: &str, hex: &str) -> AdapterResult<Vec<String>> {
		let client = self
			.cache
			.get_client_with_auth(&self.config, &AuthConfig::None)?;
		let url = self.config.url("signature-database/v1/lookup");
		let request = client.get(&url).query(&[(kind, hex), ("filter", "true")]);
		let response = send(&self.config, request).await?;
		let parsed: OpenChainResponse = read_json(&self.config, response).await?;

		if !parsed.ok {
			return Err(AdapterError::invalid_response(
				&self.config.provider_id,
				parsed.error.unwrap_or_else(|| "lookup failed".to_string()),
			));
		}

		let mut result = parsed.result.unwrap_or_default();
		let table = if kind == "event" {
			&mut result.event
		} else {
			&mut result.function
		};
		let key = hex.to_lowercase();
		Ok(table
			.remove(&key)
			.flatten()
			.unwrap_or_default()
			.into_iter()
			.map(|entry| entry.name)
			.collect())
	}
}

#[async_trait]
impl SignatureRegistry for OpenChainRegistry {
	fn id(&self) -> &str {
		&self.config.provider_id
	}

	async fn lookup_function(&self, selector: &str) -> AdapterResult<Vec<String>> {
		self.lookup("function", selector).await
	}

	async fn lookup_event(&self, topic: &str) -> AdapterResult<Vec<String>> {
		self.lookup("event", topic).await
	}
}

/// Queries every registry and merges the answers
#[derive(Debug, Clone, Default)]
pub struct SignatureResolver {
	registries: Vec<Arc<dyn SignatureRegistry>>,
}

#[derive(Clone, Copy)]
enum LookupKind {
	Function,
	Event,
}

impl SignatureResolver {
	pub fn new(registries: Vec<Arc<dyn SignatureRegistry>>) -> Self {
		Self { registries }
	}

	pub fn is_empty(&self) -> bool {
		self.registries.is_empty()
	}

	/// Sorted union of all registries' function signatures for `selector`
	pub async fn lookup_function(&self, selector: &str) -> AdapterResult<Vec<String>> {
		let selector = selector.to_lowercase();
		if !is_hex_of_len(&selector, 4) {
			return Ok(Vec::new());
		}
		self.merge(LookupKind::Function, &selector).await
	}

	/// Sorted union of all registries' event signatures for `topic`
	pub async fn lookup_event(&self, topic: &str) -> AdapterResult<Vec<String>> {
		let topic = topic.to_lowercase();
		if !is_hex_of_len(&topic, 32) {
			return Ok(Vec::new());
		}
		self.merge(LookupKind::Event, &topic).await
	}

	/// Fails only when every registry failed
	async fn merge(&self, kind: LookupKind, hex: &str) -> AdapterResult<Vec<String>> {
		let lookups = self.registries.iter().map(|registry| async move {
			let result = match kind {
				LookupKind::Function => registry.lookup_function(hex).await,
				LookupKind::Event => registry.lookup_event(hex).await,
			};
			(registry.id().to_string(), result)
		});

		let mut merged = BTreeSet::new();
		let mut last_error = None;
		let mut answered = 0usize;
		for (id, result) in join_all(lookups).await {
			match result {
				Ok(signatures) => {
					answered += 1;
					merged.extend(signatures);
				},
				Err(e) => {
					warn!("Signature registry {} failed for {}: {}", id, hex, e);
					last_error = Some(e);
				},
			}
		}

		if answered == 0 {
			if let Some(e) = last_error {
				return Err(e);
			}
		}
		debug!("Resolved {} signatures for {}", merged.len(), hex);
		Ok(merged.into_iter().collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use httpmock::prelude::*;
	use serde_json::json;

	const TRANSFER: &str = "0xa9059cbb";

	fn fourbyte(server: &MockServer) -> Arc<dyn SignatureRegistry> {
		Arc::new(FourByteRegistry::new(ProviderConfig::new(
			"4byte",
			server.base_url(),
		)))
	}

	fn openchain(server: &MockServer) -> Arc<dyn SignatureRegistry> {
		Arc::new(OpenChainRegistry::new(ProviderConfig::new(
			"openchain",
			server.base_url(),
		)))
	}

	#[tokio::test]
	async fn test_union_is_sorted_and_deduplicated() {
		let fourbyte_server = MockServer::start_async().await;
		fourbyte_server
			.mock_async(|when, then| {
				when.method(GET)
					.path("/api/v1/signatures/")
					.query_param("hex_signature", TRANSFER);
				then.status(200).json_body(json!({
					"count": 2,
					"results": [
						{"id": 1, "text_signature": "transfer(address,uint256)", "hex_signature": TRANSFER},
						{"id": 2, "text_signature": "many_msg_babbage(bytes1)", "hex_signature": TRANSFER}
					]
				}));
			})
			.await;

		let openchain_server = MockServer::start_async().await;
		openchain_server
			.mock_async(|when, then| {
				when.method(GET)
					.path("/signature-database/v1/lookup")
					.query_param("function", TRANSFER);
				then.status(200).json_body(json!({
					"ok": true,
					"result": {
						"function": {TRANSFER: [
							{"name": "transfer(address,uint256)", "filtered": false},
							{"name": "func_2093253501(bytes)", "filtered": false}
						]},
						"event": {}
					}
				}));
			})
			.await;

		let resolver =
			SignatureResolver::new(vec![openchain(&openchain_server), fourbyte(&fourbyte_server)]);
		let signatures = resolver.lookup_function(TRANSFER).await.unwrap();
		assert_eq!(
			signatures,
			vec![
				"func_2093253501(bytes)".to_string(),
				"many_msg_babbage(bytes1)".to_string(),
				"transfer(address,uint256)".to_string(),
			]
		);
	}

	#[tokio::test]
	async fn test_one_failing_registry_does_not_hide_the_other() {
		let fourbyte_server = MockServer::start_async().await;
		fourbyte_server
			.mock_async(|when, then| {
				when.path("/api/v1/event-signatures/");
				then.status(502).body("bad gateway");
			})
			.await;

		let topic = format!("0x{}", "dd".repeat(32));
		let openchain_server = MockServer::start_async().await;
		let body = json!({
			"ok": true,
			"result": {"event": {topic.clone(): [{"name": "Transfer(address,address,uint256)"}]}}
		});
		openchain_server
			.mock_async(|when, then| {
				when.path("/signature-database/v1/lookup").query_param("event", &topic);
				then.status(200).json_body(body);
			})
			.await;

		let resolver =
			SignatureResolver::new(vec![fourbyte(&fourbyte_server), openchain(&openchain_server)]);
		let events = resolver.lookup_event(&topic).await.unwrap();
		assert_eq!(events, vec!["Transfer(address,address,uint256)".to_string()]);
	}

	#[tokio::test]
	async fn test_all_failing_is_error_and_malformed_is_empty() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.path("/api/v1/signatures/");
				then.status(500);
			})
			.await;

		let resolver = SignatureResolver::new(vec![fourbyte(&server)]);
		assert!(resolver.lookup_function(TRANSFER).await.is_err());
		assert!(resolver.lookup_function("0x1234").await.unwrap().is_empty());
		assert!(resolver.lookup_function("transfer").await.unwrap().is_empty());
	}
}
