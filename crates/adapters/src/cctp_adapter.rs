//! Circle CCTP v2 adapter
//!
//! Fee tiers, fast-burn allowance and attestations from Circle's Iris API. Chains
//! without a CCTP domain are answered with empty results rather than errors.

use alloy_primitives::{hex, Bytes, B256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use usdc_types::adapters::{CctpAttestation, CctpFee, FastBurnAllowance};
use usdc_types::models::circle_domain;
use usdc_types::{
	AdapterError, AdapterResult, Amount, ProviderConfig, Route, RouteProvider, RouteQuery,
	RouteStep,
};

use crate::client_cache::{AuthConfig, ClientCache};
use crate::http::{read_json, read_optional_json, send};

pub const CIRCLE_API_BASE: &str = "https://iris-api.circle.com";

const USDC_DECIMALS: u8 = 6;
const FAST_TRANSFER_SECONDS: u64 = 20;
const STANDARD_TRANSFER_SECONDS: u64 = 1_140;

/// Fee entry from `/v2/burn/USDC/fees/{source}/{dest}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeeEntry {
	/// 1000 = fast transfer, 2000 = standard transfer
	finality_threshold: u32,
	/// Basis points, possibly fractional (1.3)
	minimum_fee: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllowanceResponse {
	/// Human USDC units
	allowance: Value,
	#[serde(default)]
	last_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
	#[serde(default)]
	messages: Vec<MessageEntry>,
}

#[derive(Debug, Deserialize)]
struct MessageEntry {
	/// Hex, or "PENDING" until Circle has signed
	#[serde(default)]
	attestation: Option<String>,
	#[serde(default)]
	message: Option<String>,
	status: String,
}

fn decimal_string(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

fn hex_bytes(value: Option<&str>) -> Option<Bytes> {
	value
		.filter(|s| s.starts_with("0x"))
		.and_then(|s| hex::decode(s).ok())
		.map(Bytes::from)
}

impl FeeEntry {
	fn normalize(self, provider: &str) -> AdapterResult<CctpFee> {
		// bps with two decimals of precision -> hundredths of a bps
		let centi_bps = decimal_string(&self.minimum_fee)
			.and_then(|fee| Amount::from_decimal_units(&fee, 2).ok())
			.and_then(|fee| u64::try_from(fee.as_u256()).ok())
			.ok_or_else(|| {
				AdapterError::invalid_response(
					provider,
					format!("unparseable minimumFee {}", self.minimum_fee),
				)
			})?;
		Ok(CctpFee {
			finality_threshold: self.finality_threshold,
			minimum_fee_centi_bps: centi_bps,
		})
	}
}

/// Adapter for Circle's CCTP v2 API
#[derive(Debug)]
pub struct CctpAdapter {
	config: ProviderConfig,
	cache: ClientCache,
}

impl CctpAdapter {
	pub fn new(config: ProviderConfig) -> Self {
		Self::with_cache(config, ClientCache::new())
	}

	pub fn with_cache(config: ProviderConfig, cache: ClientCache) -> Self {
		Self { config, cache }
	}

	fn client(&self) -> AdapterResult<Arc<reqwest::Client>> {
		let auth = match &self.config.api_key {
			Some(key) => AuthConfig::Bearer { token: key.clone() },
			None => AuthConfig::None,
		};
		self.cache.get_client_with_auth(&self.config, &auth)
	}

	/// Fee tiers for a chain pair, sorted fast first; empty when either chain has no domain
	pub async fn fetch_fees(&self, from_chain: u64, to_chain: u64) -> AdapterResult<Vec<CctpFee>> {
		let (Some(source), Some(dest)) = (circle_domain(from_chain), circle_domain(to_chain)) else {
			debug!("No CCTP domain for {} -> {}", from_chain, to_chain);
			return Ok(Vec::new());
		};

		let url = self
			.config
			.url(&format!("v2/burn/USDC/fees/{}/{}", source, dest));
		debug!("Fetching CCTP fees for domains {} -> {}", source, dest);

		let response = send(&self.config, self.client()?.get(&url)).await?;
		let Some(entries) = read_optional_json::<Vec<FeeEntry>>(&self.config, response).await?
		else {
			return Ok(Vec::new());
		};

		let mut fees = entries
			.into_iter()
			.map(|entry| entry.normalize(&self.config.provider_id))
			.collect::<AdapterResult<Vec<_>>>()?;
		fees.sort_by_key(|fee| fee.finality_threshold);
		Ok(fees)
	}

	/// Remaining USDC that can move through fast transfers right now
	pub async fn fetch_fast_burn_allowance(&self) -> AdapterResult<FastBurnAllowance> {
		let url = self.config.url("v2/fastBurn/USDC/allowance");
		let response = send(&self.config, self.client()?.get(&url)).await?;
		let parsed: AllowanceResponse = read_json(&self.config, response).await?;

		let allowance = decimal_string(&parsed.allowance)
			.and_then(|value| Amount::from_decimal_units(&value, USDC_DECIMALS).ok())
			.ok_or_else(|| {
				AdapterError::invalid_response(
					&self.config.provider_id,
					format!("unparseable allowance {}", parsed.allowance),
				)
			})?;
		debug!("CCTP fast burn allowance {}", allowance);

		Ok(FastBurnAllowance {
			allowance,
			last_updated: parsed.last_updated,
		})
	}

	/// Attestation for a burn; `None` until Circle has seen the transaction
	pub async fn fetch_attestation(
		&self,
		source_chain: u64,
		tx_hash: B256,
	) -> AdapterResult<Option<CctpAttestation>> {
		let Some(domain) = circle_domain(source_chain) else {
			return Ok(None);
		};

		let url = self.config.url(&format!("v2/messages/{}", domain));
		let request = self
			.client()?
			.get(&url)
			.query(&[("transactionHash", tx_hash.to_string())]);
		let response = send(&self.config, request).await?;

		let Some(parsed) = read_optional_json::<MessagesResponse>(&self.config, response).await?
		else {
			return Ok(None);
		};

		Ok(parsed.messages.into_iter().next().map(|entry| CctpAttestation {
			message: hex_bytes(entry.message.as_deref()),
			attestation: hex_bytes(entry.attestation.as_deref()),
			status: entry.status,
		}))
	}

	fn route_for(&self, query: &RouteQuery, fee: &CctpFee) -> Option<Route> {
		let fee_amount = fee.fee_for(query.amount)?;
		if fee_amount >= query.amount {
			return None;
		}
		let to_amount = query.amount.saturating_sub(fee_amount);
		let (label, tag, seconds) = if fee.is_fast() {
			("fast", "FASTEST", FAST_TRANSFER_SECONDS)
		} else {
			("standard", "CHEAPEST", STANDARD_TRANSFER_SECONDS)
		};

		Some(Route {
			id: format!(
				"cctp-{}-{}-{}-{}",
				label, query.from_chain, query.to_chain, fee.finality_threshold
			),
			provider: self.config.provider_id.clone(),
			from_chain_id: query.from_chain,
			to_chain_id: query.to_chain,
			from_amount: query.amount,
			to_amount,
			to_amount_min: to_amount,
			steps: vec![RouteStep {
				step_type: "cross".to_string(),
				tool: "cctp".to_string(),
				from_chain_id: query.from_chain,
				to_chain_id: query.to_chain,
				from_amount: query.amount,
				to_amount,
				estimated_duration_seconds: seconds,
				transaction: None,
			}],
			gas_cost_usd: 0.0,
			estimated_duration_seconds: seconds,
			tags: vec![tag.to_string()],
		})
	}
}

#[async_trait]
impl RouteProvider for CctpAdapter {
	fn id(&self) -> &str {
		&self.config.provider_id
	}

	fn supports_chain(&self, chain_id: u64) -> bool {
		circle_domain(chain_id).is_some()
	}

	async fn fetch_routes(&self, query: &RouteQuery) -> AdapterResult<Vec<Route>> {
		if query.from_chain == query.to_chain {
			return Ok(Vec::new());
		}
		let fees = self.fetch_fees(query.from_chain, query.to_chain).await?;
		let routes: Vec<Route> = fees
			.iter()
			.filter_map(|fee| self.route_for(query, fee))
			.collect();
		debug!(
			"CCTP produced {} routes for {} -> {}",
			routes.len(),
			query.from_chain,
			query.to_chain
		);
		Ok(routes)
	}
}
