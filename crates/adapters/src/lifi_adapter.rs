//! LI.FI adapter implementation
//!
//! Routes come from `POST /advanced/routes`, single-step quotes with a ready
//! transaction from `GET /quote`, and transfer progress from `GET /status`.

use async_trait::async_trait;
use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use usdc_types::adapters::{SwapQuote, SwapQuoteRequest, TransferStatus};
use usdc_types::models::parse_chain_id as parse_quantity;
use usdc_types::{
	AdapterError, AdapterResult, Amount, ProviderConfig, Route, RouteProvider, RouteQuery,
	RouteStep, SwapQuoteProvider, TxRequest,
};

use crate::client_cache::{AuthConfig, ClientCache};
use crate::http::{read_json, read_optional_json, send};

pub const LIFI_API_BASE: &str = "https://li.quest/v1";
const API_KEY_HEADER: &str = "x-lifi-api-key";

/// Body of `POST /advanced/routes`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoutesRequest {
	from_chain_id: u64,
	to_chain_id: u64,
	from_token_address: Address,
	to_token_address: Address,
	from_amount: Amount,
	from_address: Address,
	to_address: Address,
	options: RoutesOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoutesOptions {
	slippage: f64,
	order: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	integrator: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoutesResponse {
	#[serde(default)]
	routes: Vec<LifiRoute>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiRoute {
	id: String,
	from_chain_id: u64,
	to_chain_id: u64,
	from_amount: Amount,
	to_amount: Amount,
	to_amount_min: Amount,
	/// Decimal USD string
	#[serde(default, rename = "gasCostUSD")]
	gas_cost_usd: Option<String>,
	#[serde(default)]
	steps: Vec<LifiStep>,
	#[serde(default)]
	tags: Vec<String>,
}

/// A step as returned inside routes and by `/quote`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiStep {
	#[serde(default)]
	id: Option<String>,
	#[serde(rename = "type")]
	step_type: String,
	tool: String,
	action: LifiAction,
	estimate: LifiEstimate,
	#[serde(default)]
	transaction_request: Option<LifiTransactionRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiAction {
	from_chain_id: u64,
	to_chain_id: u64,
	from_amount: Amount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiEstimate {
	to_amount: Amount,
	#[serde(default)]
	to_amount_min: Option<Amount>,
	#[serde(default)]
	execution_duration: f64,
	#[serde(default)]
	gas_costs: Vec<LifiGasCost>,
}

#[derive(Debug, Deserialize)]
struct LifiGasCost {
	#[serde(default, rename = "amountUSD")]
	amount_usd: Option<String>,
}

/// Quantities arrive as hex strings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiTransactionRequest {
	to: Address,
	#[serde(default)]
	from: Option<Address>,
	#[serde(default)]
	data: Bytes,
	#[serde(default)]
	value: Option<Amount>,
	#[serde(default)]
	gas_limit: Option<String>,
	chain_id: u64,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
	status: String,
	#[serde(default)]
	substatus: Option<String>,
	#[serde(default)]
	sending: Option<StatusLeg>,
	#[serde(default)]
	receiving: Option<StatusLeg>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusLeg {
	#[serde(default)]
	tx_hash: Option<B256>,
}

impl From<LifiTransactionRequest> for TxRequest {
	fn from(tx: LifiTransactionRequest) -> Self {
		TxRequest {
			chain_id: tx.chain_id,
			from: tx.from,
			to: tx.to,
			data: tx.data,
			value: tx.value.unwrap_or_default(),
			gas_limit: tx.gas_limit.as_deref().and_then(parse_quantity),
		}
	}
}

impl LifiStep {
	fn into_route_step(self) -> RouteStep {
		RouteStep {
			step_type: self.step_type,
			tool: self.tool,
			from_chain_id: self.action.from_chain_id,
			to_chain_id: self.action.to_chain_id,
			from_amount: self.action.from_amount,
			to_amount: self.estimate.to_amount,
			estimated_duration_seconds: duration_secs(self.estimate.execution_duration),
			transaction: self.transaction_request.map(TxRequest::from),
		}
	}

	fn gas_cost_usd(&self) -> f64 {
		self.estimate
			.gas_costs
			.iter()
			.filter_map(|cost| cost.amount_usd.as_deref())
			.filter_map(|usd| usd.parse::<f64>().ok())
			.sum()
	}
}

fn duration_secs(value: f64) -> u64 {
	if value.is_finite() && value > 0.0 {
		value.ceil() as u64
	} else {
		0
	}
}

impl LifiRoute {
	fn into_route(self, provider: &str) -> Route {
		let estimated_duration_seconds = self
			.steps
			.iter()
			.map(|step| duration_secs(step.estimate.execution_duration))
			.sum();
		let gas_cost_usd = self
			.gas_cost_usd
			.as_deref()
			.and_then(|usd| usd.parse::<f64>().ok())
			.unwrap_or_else(|| self.steps.iter().map(LifiStep::gas_cost_usd).sum());

		Route {
			id: self.id,
			provider: provider.to_string(),
			from_chain_id: self.from_chain_id,
			to_chain_id: self.to_chain_id,
			from_amount: self.from_amount,
			to_amount: self.to_amount,
			to_amount_min: self.to_amount_min,
			steps: self.steps.into_iter().map(LifiStep::into_route_step).collect(),
			gas_cost_usd,
			estimated_duration_seconds,
			tags: self.tags,
		}
		.normalized()
	}
}

/// LI.FI adapter for cross-chain routes, quotes and transfer status
#[derive(Debug)]
pub struct LifiAdapter {
	config: ProviderConfig,
	integrator: Option<String>,
	cache: ClientCache,
}

impl LifiAdapter {
	pub fn new(config: ProviderConfig) -> Self {
		Self::with_cache(config, ClientCache::new())
	}

	/// Share a client cache with other adapters
	pub fn with_cache(config: ProviderConfig, cache: ClientCache) -> Self {
		Self {
			config,
			integrator: None,
			cache,
		}
	}

	pub fn with_integrator(mut self, integrator: Option<String>) -> Self {
		self.integrator = integrator.filter(|name| !name.is_empty());
		self
	}

	fn client(&self) -> AdapterResult<Arc<reqwest::Client>> {
		let auth = AuthConfig::api_key_header(API_KEY_HEADER, self.config.api_key.as_ref());
		self.cache.get_client_with_auth(&self.config, &auth)
	}

	/// Single-step quote including a ready-to-sign transaction; `None` when LI.FI has no quote
	pub async fn fetch_quote(&self, query: &RouteQuery) -> AdapterResult<Option<Route>> {
		let url = self.config.url("quote");
		debug!(
			"Requesting LI.FI quote {} -> {} for {}",
			query.from_chain, query.to_chain, query.amount
		);

		let mut params = vec![
			("fromChain", query.from_chain.to_string()),
			("toChain", query.to_chain.to_string()),
			("fromToken", query.from_token.to_string()),
			("toToken", query.to_token.to_string()),
			("fromAmount", query.amount.to_string()),
			("fromAddress", query.from_address.to_string()),
			("toAddress", query.to_address.to_string()),
			("slippage", query.slippage_fraction().to_string()),
		];
		if let Some(integrator) = &self.integrator {
			params.push(("integrator", integrator.clone()));
		}

		let response = send(&self.config, self.client()?.get(&url).query(&params)).await?;
		let Some(step) = read_optional_json::<LifiStep>(&self.config, response).await? else {
			debug!("LI.FI has no quote for {} -> {}", query.from_chain, query.to_chain);
			return Ok(None);
		};

		let id = step
			.id
			.clone()
			.unwrap_or_else(|| format!("{}-{}", step.tool, query.amount));
		let gas_cost_usd = step.gas_cost_usd();
		let from_amount = step.action.from_amount;
		let to_amount = step.estimate.to_amount;
		let to_amount_min = step.estimate.to_amount_min.unwrap_or(to_amount);
		let from_chain_id = step.action.from_chain_id;
		let to_chain_id = step.action.to_chain_id;
		let route_step = step.into_route_step();

		Ok(Some(
			Route {
				id,
				provider: self.config.provider_id.clone(),
				from_chain_id,
				to_chain_id,
				from_amount,
				to_amount,
				to_amount_min,
				estimated_duration_seconds: route_step.estimated_duration_seconds,
				steps: vec![route_step],
				gas_cost_usd,
				tags: Vec::new(),
			}
			.normalized(),
		))
	}

	/// Progress of a cross-chain transfer; `None` when LI.FI does not know the hash
	pub async fn fetch_status(
		&self,
		tx_hash: B256,
		from_chain: u64,
		to_chain: u64,
	) -> AdapterResult<Option<TransferStatus>> {
		let url = self.config.url("status");
		let params = [
			("txHash", tx_hash.to_string()),
			("fromChain", from_chain.to_string()),
			("toChain", to_chain.to_string()),
		];
		let response = send(&self.config, self.client()?.get(&url).query(&params)).await?;
		let status = read_optional_json::<StatusResponse>(&self.config, response).await?;

		Ok(status
			.filter(|s| s.status != "NOT_FOUND")
			.map(|s| TransferStatus {
				status: s.status,
				substatus: s.substatus,
				sending_tx: s.sending.and_then(|leg| leg.tx_hash),
				receiving_tx: s.receiving.and_then(|leg| leg.tx_hash),
			}))
	}
}

#[async_trait]
impl RouteProvider for LifiAdapter {
	fn id(&self) -> &str {
		&self.config.provider_id
	}

	async fn fetch_routes(&self, query: &RouteQuery) -> AdapterResult<Vec<Route>> {
		let url = self.config.url("advanced/routes");
		let body = RoutesRequest {
			from_chain_id: query.from_chain,
			to_chain_id: query.to_chain,
			from_token_address: query.from_token,
			to_token_address: query.to_token,
			from_amount: query.amount,
			from_address: query.from_address,
			to_address: query.to_address,
			options: RoutesOptions {
				slippage: query.slippage_fraction(),
				order: "CHEAPEST",
				integrator: self.integrator.clone(),
			},
		};

		debug!(
			"Requesting LI.FI routes {} -> {} for {} from {}",
			query.from_chain, query.to_chain, query.amount, query.from_address
		);
		let response = send(&self.config, self.client()?.post(&url).json(&body)).await?;
		let parsed: RoutesResponse = read_json(&self.config, response).await?;

		let routes: Vec<Route> = parsed
			.routes
			.into_iter()
			.map(|route| route.into_route(&self.config.provider_id))
			.collect();
		debug!("LI.FI returned {} routes", routes.len());
		Ok(routes)
	}
}

#[async_trait]
impl SwapQuoteProvider for LifiAdapter {
	fn id(&self) -> &str {
		&self.config.provider_id
	}

	async fn fetch_swap_quote(&self, request: &SwapQuoteRequest) -> AdapterResult<Option<SwapQuote>> {
		let query = RouteQuery {
			from_chain: request.chain_id,
			to_chain: request.chain_id,
			from_token: request.sell_token,
			to_token: request.buy_token,
			amount: request.sell_amount,
			from_address: request.taker,
			to_address: request.taker,
			slippage_bps: request.slippage_bps,
		};

		let Some(route) = self.fetch_quote(&query).await? else {
			return Ok(None);
		};
		if route.to_amount.is_zero() {
			return Err(AdapterError::invalid_response(
				&self.config.provider_id,
				"quote with zero output",
			));
		}

		let gas_estimate = route.transactions().find_map(|tx| tx.gas_limit);
		let transaction = route.transactions().next().cloned();
		Ok(Some(SwapQuote {
			provider: self.config.provider_id.clone(),
			chain_id: request.chain_id,
			sell_token: request.sell_token,
			buy_token: request.buy_token,
			sell_amount: route.from_amount,
			buy_amount: route.to_amount,
			min_buy_amount: route.to_amount_min,
			gas_estimate,
			transaction,
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use httpmock::prelude::*;
	use serde_json::json;
	use std::str::FromStr;

	const USDC_ETH: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
	const USDC_BASE: &str = "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913";

	fn adapter(server: &MockServer) -> LifiAdapter {
		LifiAdapter::new(ProviderConfig::new("lifi", server.base_url()))
			.with_integrator(Some("usdc-router".to_string()))
	}

	fn query() -> RouteQuery {
		RouteQuery {
			from_chain: 1,
			to_chain: 8453,
			from_token: Address::from_str(USDC_ETH).unwrap(),
			to_token: Address::from_str(USDC_BASE).unwrap(),
			amount: Amount::from(5_000_000u64),
			from_address: Address::repeat_byte(0x11),
			to_address: Address::repeat_byte(0x11),
			slippage_bps: 50,
		}
	}

	fn step_json() -> serde_json::Value {
		json!({
			"id": "step-1",
			"type": "cross",
			"tool": "cctp",
			"action": {
				"fromChainId": 1,
				"toChainId": 8453,
				"fromAmount": "5000000",
				"fromToken": {"address": USDC_ETH},
				"toToken": {"address": USDC_BASE}
			},
			"estimate": {
				"toAmount": "4990000",
				"toAmountMin": "4965050",
				"executionDuration": 62.5,
				"gasCosts": [{"amountUSD": "1.25"}]
			},
			"transactionRequest": {
				"to": "0x1231deb6f5749ef6ce6943a275a1d3e7486f4eae",
				"data": "0xabcd",
				"value": "0x0",
				"gasLimit": "0x30d40",
				"chainId": 1
			}
		})
	}

	#[tokio::test]
	async fn test_fetch_routes_normalizes_amounts() {
		let server = MockServer::start_async().await;
		let mock = server
			.mock_async(|when, then| {
				when.method(POST)
					.path("/advanced/routes")
					.json_body_partial(r#"{"fromChainId":1,"toChainId":8453,"fromAmount":"5000000"}"#);
				then.status(200).json_body(json!({
					"routes": [{
						"id": "route-a",
						"fromChainId": 1,
						"toChainId": 8453,
						"fromAmount": "5000000",
						"toAmount": "4990000",
						"toAmountMin": "4995000",
						"gasCostUSD": "0.42",
						"steps": [step_json()],
						"tags": ["CHEAPEST"]
					}]
				}));
			})
			.await;

		let routes = adapter(&server).fetch_routes(&query()).await.unwrap();
		mock.assert_async().await;

		assert_eq!(routes.len(), 1);
		let route = &routes[0];
		assert_eq!(route.provider, "lifi");
		assert_eq!(route.to_amount, Amount::from(4_990_000u64));
		// Clamped to toAmount
		assert_eq!(route.to_amount_min, Amount::from(4_990_000u64));
		assert_eq!(route.gas_cost_usd, 0.42);
		assert_eq!(route.estimated_duration_seconds, 63);
		assert!(route.has_tag("cheapest"));

		let tx = route.transactions().next().unwrap();
		assert_eq!(tx.gas_limit, Some(200_000));
		assert_eq!(tx.data, Bytes::from(vec![0xab, 0xcd]));
	}

	#[tokio::test]
	async fn test_empty_routes_is_no_data() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(POST).path("/advanced/routes");
				then.status(200).json_body(json!({"routes": []}));
			})
			.await;

		assert!(adapter(&server).fetch_routes(&query()).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_provider_error_carries_status_and_body() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(POST).path("/advanced/routes");
				then.status(429).body("Too Many Requests");
			})
			.await;

		let err = adapter(&server).fetch_routes(&query()).await.unwrap_err();
		assert_eq!(err.status_code(), Some(429));
		assert!(err.to_string().contains("Too Many Requests"));
	}

	#[tokio::test]
	async fn test_float_amount_rejected_as_invalid_response() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(POST).path("/advanced/routes");
				then.status(200).json_body(json!({
					"routes": [{
						"id": "r",
						"fromChainId": 1,
						"toChainId": 8453,
						"fromAmount": 5000000.5,
						"toAmount": "1",
						"toAmountMin": "1"
					}]
				}));
			})
			.await;

		let err = adapter(&server).fetch_routes(&query()).await.unwrap_err();
		assert!(matches!(err, AdapterError::InvalidResponse { .. }));
	}

	#[tokio::test]
	async fn test_fetch_quote_and_swap_quote() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(GET)
					.path("/quote")
					.query_param("fromChain", "1")
					.query_param("fromAmount", "5000000")
					.query_param("slippage", "0.005")
					.query_param("integrator", "usdc-router");
				then.status(200).json_body(step_json());
			})
			.await;

		let lifi = adapter(&server);
		let route = lifi.fetch_quote(&query()).await.unwrap().unwrap();
		assert_eq!(route.id, "step-1");
		assert_eq!(route.to_amount_min, Amount::from(4_965_050u64));
		assert_eq!(route.gas_cost_usd, 1.25);

		let swap = lifi
			.fetch_swap_quote(&SwapQuoteRequest {
				chain_id: 1,
				sell_token: query().from_token,
				buy_token: query().to_token,
				sell_amount: Amount::from(5_000_000u64),
				taker: Address::repeat_byte(0x11),
				slippage_bps: 50,
			})
			.await
			.unwrap()
			.unwrap();
		assert_eq!(swap.buy_amount, Amount::from(4_990_000u64));
		assert_eq!(swap.gas_estimate, Some(200_000));
	}

	#[tokio::test]
	async fn test_quote_not_found_is_none() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(GET).path("/quote");
				then.status(404)
					.json_body(json!({"message": "No available quotes for the requested transfer"}));
			})
			.await;

		assert!(adapter(&server).fetch_quote(&query()).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_fetch_status() {
		let server = MockServer::start_async().await;
		let hash = B256::repeat_byte(0x42);
		server
			.mock_async(|when, then| {
				when.method(GET).path("/status").query_param("fromChain", "1");
				then.status(200).json_body(json!({
					"status": "DONE",
					"substatus": "COMPLETED",
					"sending": {"txHash": format!("0x{}", "42".repeat(32))},
					"receiving": {"txHash": format!("0x{}", "43".repeat(32))}
				}));
			})
			.await;

		let status = adapter(&server)
			.fetch_status(hash, 1, 8453)
			.await
			.unwrap()
			.unwrap();
		assert!(status.is_final());
		assert_eq!(status.sending_tx, Some(hash));
		assert_eq!(status.receiving_tx, Some(B256::repeat_byte(0x43)));
	}
}
