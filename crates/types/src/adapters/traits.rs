//! Provider adapter traits

use super::{AdapterResult, SwapQuote, SwapQuoteRequest};
use crate::routes::{Route, RouteQuery};
use async_trait::async_trait;
use std::fmt::Debug;

/// Source of cross-chain routes
#[async_trait]
pub trait RouteProvider: Send + Sync + Debug {
	/// Adapter id, copied into every route's `provider`
	fn id(&self) -> &str;

	/// Chains the provider can route from/to; unsupported pairs are skipped, not errors
	fn supports_chain(&self, _chain_id: u64) -> bool {
		true
	}

	/// Routes for a validated query; an empty vec means "no data"
	async fn fetch_routes(&self, query: &RouteQuery) -> AdapterResult<Vec<Route>>;
}

/// Single-chain swap quote source used by the meta-aggregator
#[async_trait]
pub trait SwapQuoteProvider: Send + Sync + Debug {
	fn id(&self) -> &str;

	/// `None` when the provider has no liquidity for the pair
	async fn fetch_swap_quote(&self, request: &SwapQuoteRequest) -> AdapterResult<Option<SwapQuote>>;
}

/// Function selector / event topic signature database
#[async_trait]
pub trait SignatureRegistry: Send + Sync + Debug {
	fn id(&self) -> &str;

	/// Text signatures for a 4-byte selector (`0x`-prefixed)
	async fn lookup_function(&self, selector: &str) -> AdapterResult<Vec<String>>;

	/// Text signatures for a 32-byte event topic (`0x`-prefixed)
	async fn lookup_event(&self, topic: &str) -> AdapterResult<Vec<String>>;
}
