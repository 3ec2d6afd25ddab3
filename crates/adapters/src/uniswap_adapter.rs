//! Uniswap v4 subgraph adapter (pools and positions)
//!
//! One GraphQL endpoint per chain. A chain without a configured subgraph has
//! no data, not an error.

use alloy_primitives::Address;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use usdc_types::adapters::{UniswapPool, UniswapPosition};
use usdc_types::{AdapterError, AdapterResult, Amount, ProviderConfig};

use crate::client_cache::{AuthConfig, ClientCache};
use crate::http::{read_json, send};

const MAX_RESULTS: u32 = 50;

const POOLS_QUERY: &str = r#"query Pools($token0: String!, $token1: String!, $first: Int!) {
  pools(where: {token0: $token0, token1: $token1}, orderBy: liquidity, orderDirection: desc, first: $first) {
    id
    feeTier
    liquidity
    sqrtPrice
    tick
    token0 { id }
    token1 { id }
  }
}"#;

const POSITIONS_QUERY: &str = r#"query Positions($owner: String!, $first: Int!) {
  positions(where: {owner: $owner}, first: $first) {
    id
    tokenId
    owner
    pool { id }
    tickLower
    tickUpper
    liquidity
  }
}"#;

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
	query: &'a str,
	variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
	data: Option<T>,
	#[serde(default)]
	errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
	message: String,
}

#[derive(Debug, Deserialize)]
struct PoolsData {
	pools: Vec<PoolEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoolEntry {
	id: String,
	fee_tier: String,
	liquidity: Amount,
	sqrt_price: Amount,
	#[serde(default)]
	tick: Option<String>,
	token0: EntityRef,
	token1: EntityRef,
}

#[derive(Debug, Deserialize)]
struct EntityRef {
	id: String,
}

#[derive(Debug, Deserialize)]
struct PositionsData {
	positions: Vec<PositionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionEntry {
	id: String,
	token_id: Amount,
	owner: Address,
	#[serde(default)]
	pool: Option<EntityRef>,
	#[serde(default)]
	tick_lower: Option<String>,
	#[serde(default)]
	tick_upper: Option<String>,
	#[serde(default)]
	liquidity: Option<Amount>,
}

fn parse_tick(value: Option<&str>) -> Option<i32> {
	value.and_then(|tick| tick.parse().ok())
}

/// Uniswap v4 subgraph adapter
#[derive(Debug)]
pub struct UniswapAdapter {
	/// Shared settings; `base_url` is replaced per chain
	config: ProviderConfig,
	subgraphs: HashMap<u64, String>,
	cache: ClientCache,
}

impl UniswapAdapter {
	pub fn new(config: ProviderConfig, subgraphs: HashMap<u64, String>) -> Self {
		Self::with_cache(config, subgraphs, ClientCache::new())
	}

	pub fn with_cache(
		config: ProviderConfig,
		subgraphs: HashMap<u64, String>,
		cache: ClientCache,
	) -> Self {
		Self {
			config,
			subgraphs,
			cache,
		}
	}

	pub fn supports_chain(&self, chain_id: u64) -> bool {
		self.subgraphs.contains_key(&chain_id)
	}

	fn endpoint(&self, chain_id: u64) -> Option<ProviderConfig> {
		self.subgraphs.get(&chain_id).map(|url| ProviderConfig {
			base_url: url.trim_end_matches('/').to_string(),
			..self.config.clone()
		})
	}

	async fn query<T: DeserializeOwned>(
		&self,
		endpoint: &ProviderConfig,
		query: &str,
		variables: Value,
	) -> AdapterResult<T> {
		let auth = match &endpoint.api_key {
			Some(key) => AuthConfig::Bearer { token: key.clone() },
			None => AuthConfig::None,
		};
		let client: Arc<reqwest::Client> = self.cache.get_client_with_auth(endpoint, &auth)?;
		let body = GraphQlRequest { query, variables };

		let response = send(endpoint, client.post(&endpoint.base_url).json(&body)).await?;
		let parsed: GraphQlResponse<T> = read_json(endpoint, response).await?;

		if let Some(error) = parsed.errors.first() {
			return Err(AdapterError::invalid_response(
				&endpoint.provider_id,
				format!("subgraph error: {}", error.message),
			));
		}
		parsed.data.ok_or_else(|| {
			AdapterError::invalid_response(&endpoint.provider_id, "subgraph returned no data")
		})
	}

	/// Pools for a token pair on one chain, most liquid first
	pub async fn fetch_pools(
		&self,
		chain_id: u64,
		token_a: Address,
		token_b: Address,
	) -> AdapterResult<Vec<UniswapPool>> {
		let Some(endpoint) = self.endpoint(chain_id) else {
			debug!("No Uniswap subgraph configured for chain {}", chain_id);
			return Ok(Vec::new());
		};

		// Pools are keyed with the lower address as token0
		let (token0, token1) = if token_a <= token_b {
			(token_a, token_b)
		} else {
			(token_b, token_a)
		};
		let variables = json!({
			"token0": token0.to_string().to_lowercase(),
			"token1": token1.to_string().to_lowercase(),
			"first": MAX_RESULTS,
		});
		let data: PoolsData = self.query(&endpoint, POOLS_QUERY, variables).await?;
		debug!("Uniswap subgraph returned {} pools on chain {}", data.pools.len(), chain_id);

		data.pools
			.into_iter()
			.map(|pool| {
				let invalid = |field: &str, value: &str| {
					AdapterError::invalid_response(
						&endpoint.provider_id,
						format!("pool {} {}: {}", pool.id, field, value),
					)
				};
				Ok(UniswapPool {
					fee_tier: pool
						.fee_tier
						.parse()
						.map_err(|_| invalid("feeTier", &pool.fee_tier))?,
					token0: pool
						.token0
						.id
						.parse()
						.map_err(|_| invalid("token0", &pool.token0.id))?,
					token1: pool
						.token1
						.id
						.parse()
						.map_err(|_| invalid("token1", &pool.token1.id))?,
					tick: parse_tick(pool.tick.as_deref()),
					liquidity: pool.liquidity,
					sqrt_price: pool.sqrt_price,
					chain_id,
					id: pool.id,
				})
			})
			.collect()
	}

	/// Liquidity positions owned by `owner` on one chain
	pub async fn fetch_positions(
		&self,
		chain_id: u64,
		owner: Address,
	) -> AdapterResult<Vec<UniswapPosition>> {
		let Some(endpoint) = self.endpoint(chain_id) else {
			return Ok(Vec::new());
		};

		let variables = json!({
			"owner": owner.to_string().to_lowercase(),
			"first": MAX_RESULTS,
		});
		let data: PositionsData = self.query(&endpoint, POSITIONS_QUERY, variables).await?;

		Ok(data
			.positions
			.into_iter()
			.map(|position| UniswapPosition {
				id: position.id,
				chain_id,
				token_id: position.token_id,
				owner: position.owner,
				pool_id: position.pool.map(|pool| pool.id),
				tick_lower: parse_tick(position.tick_lower.as_deref()),
				tick_upper: parse_tick(position.tick_upper.as_deref()),
				liquidity: position.liquidity,
			})
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use httpmock::prelude::*;

	fn adapter(server: &MockServer) -> UniswapAdapter {
		let subgraphs = HashMap::from([(8453u64, server.url("/subgraphs/base"))]);
		UniswapAdapter::new(ProviderConfig::new("uniswap", "unused"), subgraphs)
	}

	#[tokio::test]
	async fn test_pools_sorted_pair_and_parsed() {
		let server = MockServer::start_async().await;
		let low = Address::repeat_byte(0x01);
		let high = Address::repeat_byte(0xee);
		let mock = server
			.mock_async(|when, then| {
				when.method(POST)
					.path("/subgraphs/base")
					.body_contains(&format!("\"token0\":\"{}\"", low.to_string().to_lowercase()));
				then.status(200).json_body(json!({
					"data": {"pools": [{
						"id": "0xpool",
						"feeTier": "500",
						"liquidity": "123456789",
						"sqrtPrice": "79228162514264337593543950336",
						"tick": "-12",
						"token0": {"id": low.to_string().to_lowercase()},
						"token1": {"id": high.to_string().to_lowercase()}
					}]}
				}));
			})
			.await;

		// Reversed on purpose
		let pools = adapter(&server).fetch_pools(8453, high, low).await.unwrap();
		mock.assert_async().await;
		assert_eq!(pools.len(), 1);
		assert_eq!(pools[0].fee_tier, 500);
		assert_eq!(pools[0].tick, Some(-12));
		assert_eq!(pools[0].token0, low);
		assert_eq!(pools[0].liquidity, Amount::from(123_456_789u64));
	}

	#[tokio::test]
	async fn test_unconfigured_chain_is_empty() {
		let server = MockServer::start_async().await;
		let uniswap = adapter(&server);
		assert!(!uniswap.supports_chain(1));
		assert!(uniswap
			.fetch_pools(1, Address::ZERO, Address::repeat_byte(1))
			.await
			.unwrap()
			.is_empty());
		assert!(uniswap.fetch_positions(1, Address::ZERO).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_graphql_errors_are_invalid_response() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(POST).path("/subgraphs/base");
				then.status(200)
					.json_body(json!({"errors": [{"message": "indexing_error"}]}));
			})
			.await;

		let err = adapter(&server)
			.fetch_positions(8453, Address::ZERO)
			.await
			.unwrap_err();
		assert!(err.to_string().contains("indexing_error"));
	}

	#[tokio::test]
	async fn test_positions() {
		let server = MockServer::start_async().await;
		let owner = Address::repeat_byte(0x77);
		server
			.mock_async(|when, then| {
				when.method(POST).path("/subgraphs/base").body_contains("Positions");
				then.status(200).json_body(json!({
					"data": {"positions": [{
						"id": "42",
						"tokenId": "42",
						"owner": owner,
						"pool": {"id": "0xpool"},
						"tickLower": "-600",
						"tickUpper": "600",
						"liquidity": "1000"
					}]}
				}));
			})
			.await;

		let positions = adapter(&server).fetch_positions(8453, owner).await.unwrap();
		assert_eq!(positions.len(), 1);
		assert_eq!(positions[0].token_id, Amount::from(42u64));
		assert_eq!(positions[0].pool_id.as_deref(), Some("0xpool"));
		assert_eq!(positions[0].tick_lower, Some(-600));
		assert_eq!(positions[0].liquidity, Some(Amount::from(1000u64)));
	}
}
