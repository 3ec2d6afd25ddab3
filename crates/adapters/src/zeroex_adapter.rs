//! 0x Swap API v2 adapter (indicative prices)

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use usdc_types::adapters::{SwapQuote, SwapQuoteRequest};
use usdc_types::models::parse_chain_id as parse_quantity;
use usdc_types::{AdapterResult, Amount, ProviderConfig, SwapQuoteProvider, TxRequest};

use crate::client_cache::{AuthConfig, ClientCache};
use crate::http::{read_json, send};

pub const ZEROEX_API_BASE: &str = "https://api.0x.org";

const API_KEY_HEADER: &str = "0x-api-key";
const API_VERSION: &str = "v2";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceResponse {
	liquidity_available: bool,
	#[serde(default)]
	buy_amount: Option<Amount>,
	#[serde(default)]
	min_buy_amount: Option<Amount>,
	#[serde(default)]
	sell_amount: Option<Amount>,
	#[serde(default)]
	gas: Option<String>,
	#[serde(default)]
	transaction: Option<ZeroExTransaction>,
}

#[derive(Debug, Deserialize)]
struct ZeroExTransaction {
	to: Address,
	#[serde(default)]
	data: Bytes,
	#[serde(default)]
	value: Option<Amount>,
	#[serde(default)]
	gas: Option<String>,
}

/// 0x adapter used by the meta-aggregator
#[derive(Debug)]
pub struct ZeroExAdapter {
	config: ProviderConfig,
	cache: ClientCache,
}

impl ZeroExAdapter {
	pub fn new(config: ProviderConfig) -> Self {
		Self::with_cache(config, ClientCache::new())
	}

	pub fn with_cache(config: ProviderConfig, cache: ClientCache) -> Self {
		let config = config.with_header("0x-version", API_VERSION);
		Self { config, cache }
	}

	fn client(&self) -> AdapterResult<Arc<reqwest::Client>> {
		let auth = AuthConfig::api_key_header(API_KEY_HEADER, self.config.api_key.as_ref());
		self.cache.get_client_with_auth(&self.config, &auth)
	}
}

#[async_trait]
impl SwapQuoteProvider for ZeroExAdapter {
	fn id(&self) -> &str {
		&self.config.provider_id
	}

	async fn fetch_swap_quote(&self, request: &SwapQuoteRequest) -> AdapterResult<Option<SwapQuote>> {
		let url = self.config.url("swap/permit2/price");
		let params = [
			("chainId", request.chain_id.to_string()),
			("sellToken", request.sell_token.to_string()),
			("buyToken", request.buy_token.to_string()),
			("sellAmount", request.sell_amount.to_string()),
			("taker", request.taker.to_string()),
			("slippageBps", request.slippage_bps.to_string()),
		];
		debug!(
			"Requesting 0x price on chain {} for {}",
			request.chain_id, request.sell_amount
		);

		let response = send(&self.config, self.client()?.get(&url).query(&params)).await?;
		let price: PriceResponse = read_json(&self.config, response).await?;

		let (true, Some(buy_amount)) = (price.liquidity_available, price.buy_amount) else {
			debug!("0x has no liquidity on chain {}", request.chain_id);
			return Ok(None);
		};

		let gas_estimate = price.gas.as_deref().and_then(parse_quantity);
		let transaction = price.transaction.map(|tx| TxRequest {
			chain_id: request.chain_id,
			from: Some(request.taker),
			to: tx.to,
			data: tx.data,
			value: tx.value.unwrap_or_default(),
			gas_limit: tx.gas.as_deref().and_then(parse_quantity).or(gas_estimate),
		});

		Ok(Some(SwapQuote {
			provider: self.config.provider_id.clone(),
			chain_id: request.chain_id,
			sell_token: request.sell_token,
			buy_token: request.buy_token,
			sell_amount: price.sell_amount.unwrap_or(request.sell_amount),
			buy_amount,
			min_buy_amount: price.min_buy_amount.unwrap_or(buy_amount).min(buy_amount),
			gas_estimate,
			transaction,
		}))
	}
}
