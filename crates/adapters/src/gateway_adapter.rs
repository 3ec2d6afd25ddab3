//! Circle Gateway adapter: unified balances and transfer attestations

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use usdc_types::adapters::{GatewayAttestation, GatewayBalance, SignedBurnIntent};
use usdc_types::models::{chain_for_domain, circle_domain};
use usdc_types::{AdapterError, AdapterResult, Amount, ProviderConfig};

use crate::client_cache::{AuthConfig, ClientCache};
use crate::http::{read_json, send};

pub const GATEWAY_API_BASE: &str = "https://gateway-api.circle.com";

const USDC_DECIMALS: u8 = 6;

#[derive(Debug, Serialize)]
struct BalancesRequest {
	token: &'static str,
	sources: Vec<BalanceSource>,
}

#[derive(Debug, Serialize)]
struct BalanceSource {
	domain: u32,
	depositor: Address,
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
	#[serde(default)]
	balances: Vec<BalanceEntry>,
}

#[derive(Debug, Deserialize)]
struct BalanceEntry {
	domain: u32,
	depositor: Address,
	/// Human USDC units ("12.345")
	balance: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferResponse {
	#[serde(default)]
	transfer_id: Option<String>,
	attestation: Bytes,
	signature: Bytes,
}

/// Adapter for Circle Gateway's unified USDC balance API
#[derive(Debug)]
pub struct GatewayAdapter {
	config: ProviderConfig,
	testnet: bool,
	cache: ClientCache,
}

impl GatewayAdapter {
	pub fn new(config: ProviderConfig) -> Self {
		Self::with_cache(config, ClientCache::new())
	}

	pub fn with_cache(config: ProviderConfig, cache: ClientCache) -> Self {
		Self {
			config,
			testnet: false,
			cache,
		}
	}

	/// Map returned domains to testnet chain ids
	pub fn with_testnet(mut self, testnet: bool) -> Self {
		self.testnet = testnet;
		self
	}

	fn client(&self) -> AdapterResult<Arc<reqwest::Client>> {
		self.cache
			.get_client_with_auth(&self.config, &AuthConfig::None)
	}

	/// Balances of `depositor` on each of `chain_ids`; chains without a Gateway domain are skipped
	pub async fn fetch_balances(
		&self,
		depositor: Address,
		chain_ids: &[u64],
	) -> AdapterResult<Vec<GatewayBalance>> {
		let mut sources: Vec<BalanceSource> = chain_ids
			.iter()
			.filter_map(|chain_id| circle_domain(*chain_id))
			.map(|domain| BalanceSource { domain, depositor })
			.collect();
		sources.sort_by_key(|source| source.domain);
		sources.dedup_by_key(|source| source.domain);
		if sources.is_empty() {
			return Ok(Vec::new());
		}

		debug!(
			"Fetching Gateway balances for {} on {} domains",
			depositor,
			sources.len()
		);
		let body = BalancesRequest {
			token: "USDC",
			sources,
		};
		let url = self.config.url("v1/balances");
		let response = send(&self.config, self.client()?.post(&url).json(&body)).await?;
		let parsed: BalancesResponse = read_json(&self.config, response).await?;

		parsed
			.balances
			.into_iter()
			.map(|entry| {
				let balance = Amount::from_decimal_units(&entry.balance, USDC_DECIMALS).map_err(
					|e| {
						AdapterError::invalid_response(
							&self.config.provider_id,
							format!("balance {}: {}", entry.balance, e),
						)
					},
				)?;
				Ok(GatewayBalance {
					domain: entry.domain,
					chain_id: chain_for_domain(entry.domain, self.testnet),
					depositor: entry.depositor,
					balance,
				})
			})
			.collect()
	}

	/// Sum of all returned balances
	pub async fn fetch_total_balance(
		&self,
		depositor: Address,
		chain_ids: &[u64],
	) -> AdapterResult<Amount> {
		let balances = self.fetch_balances(depositor, chain_ids).await?;
		balances
			.iter()
			.try_fold(Amount::ZERO, |total, b| total.checked_add(b.balance))
			.ok_or_else(|| {
				AdapterError::invalid_response(&self.config.provider_id, "balance overflow")
			})
	}

	/// Submit signed burn intents and receive the mint attestation
	pub async fn request_transfer(
		&self,
		intents: &[SignedBurnIntent],
	) -> AdapterResult<GatewayAttestation> {
		if intents.is_empty() {
			return Err(AdapterError::Config {
				reason: "at least one signed burn intent is required".to_string(),
			});
		}

		let url = self.config.url("v1/transfer");
		debug!("Submitting {} burn intents to Gateway", intents.len());
		let response = send(&self.config, self.client()?.post(&url).json(intents)).await?;
		let parsed: TransferResponse = read_json(&self.config, response).await?;

		Ok(GatewayAttestation {
			transfer_id: parsed.transfer_id,
			attestation: parsed.attestation,
			signature: parsed.signature,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use httpmock::prelude::*;
	use serde_json::json;

	fn adapter(server: &MockServer) -> GatewayAdapter {
		GatewayAdapter::new(ProviderConfig::new("gateway", server.base_url()))
	}

	#[tokio::test]
	async fn test_balances_converted_to_units() {
		let server = MockServer::start_async().await;
		let depositor = Address::repeat_byte(0x44);
		let mock = server
			.mock_async(|when, then| {
				when.method(POST)
					.path("/v1/balances")
					.json_body_partial(r#"{"token":"USDC"}"#);
				then.status(200).json_body(json!({
					"token": "USDC",
					"balances": [
						{"domain": 0, "depositor": depositor, "balance": "12.5"},
						{"domain": 6, "depositor": depositor, "balance": "0.000001"}
					]
				}));
			})
			.await;

		let gateway = adapter(&server);
		let balances = gateway.fetch_balances(depositor, &[1, 8453, 56]).await.unwrap();
		assert_eq!(balances.len(), 2);
		assert_eq!(balances[0].balance, Amount::from(12_500_000u64));
		assert_eq!(balances[0].chain_id, Some(1));
		assert_eq!(balances[1].chain_id, Some(8453));
		assert_eq!(balances[1].balance, Amount::from(1u64));

		let total = gateway.fetch_total_balance(depositor, &[1, 8453]).await.unwrap();
		assert_eq!(total, Amount::from(12_500_001u64));
		assert_eq!(mock.hits_async().await, 2);
	}

	#[tokio::test]
	async fn test_no_supported_chains_skips_request() {
		let server = MockServer::start_async().await;
		let mock = server
			.mock_async(|when, then| {
				when.method(POST).path("/v1/balances");
				then.status(500);
			})
			.await;

		let balances = adapter(&server)
			.fetch_balances(Address::ZERO, &[56, 250])
			.await
			.unwrap();
		assert!(balances.is_empty());
		assert_eq!(mock.hits_async().await, 0);
	}

	#[tokio::test]
	async fn test_transfer_attestation() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(POST).path("/v1/transfer");
				then.status(200).json_body(json!({
					"transferId": "t-1",
					"attestation": "0x0102",
					"signature": "0x0304"
				}));
			})
			.await;

		let intent = SignedBurnIntent {
			burn_intent: json!({"maxBlockHeight": "100"}),
			signature: Bytes::from(vec![9]),
		};
		let attestation = adapter(&server).request_transfer(&[intent]).await.unwrap();
		assert_eq!(attestation.transfer_id.as_deref(), Some("t-1"));
		assert_eq!(attestation.attestation, Bytes::from(vec![1, 2]));
	}

	#[tokio::test]
	async fn test_transfer_rejection_is_provider_error() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(POST).path("/v1/transfer");
				then.status(400).body(r#"{"message":"insufficient balance"}"#);
			})
			.await;

		let intent = SignedBurnIntent {
			burn_intent: json!({}),
			signature: Bytes::new(),
		};
		let err = adapter(&server).request_transfer(&[intent]).await.unwrap_err();
		assert_eq!(err.status_code(), Some(400));
		assert!(err.to_string().contains("insufficient balance"));

		assert!(matches!(
			adapter(&server).request_transfer(&[]).await,
			Err(AdapterError::Config { .. })
		));
	}
}
