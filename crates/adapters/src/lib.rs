//! USDC Router Adapters
//!
//! Provider-specific adapters. Each one turns provider JSON into the normalized
//! models of `usdc-types` at the boundary.

pub mod cctp_adapter;
pub mod client_cache;
pub mod gateway_adapter;
mod http;
pub mod lifi_adapter;
pub mod meta_aggregator;
pub mod signature_adapter;
pub mod uniswap_adapter;
pub mod zeroex_adapter;

pub use cctp_adapter::CctpAdapter;
pub use client_cache::{AuthConfig, ClientCache, ClientConfig};
pub use gateway_adapter::GatewayAdapter;
pub use lifi_adapter::LifiAdapter;
pub use meta_aggregator::{AggregatedQuotes, MetaAggregator};
pub use signature_adapter::{FourByteRegistry, OpenChainRegistry, SignatureResolver};
pub use uniswap_adapter::UniswapAdapter;
pub use zeroex_adapter::ZeroExAdapter;
pub use usdc_types::{AdapterError, AdapterResult, RouteProvider, SwapQuoteProvider};

use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of route providers keyed by adapter id
#[derive(Debug, Default, Clone)]
pub struct AdapterRegistry {
	providers: BTreeMap<String, Arc<dyn RouteProvider>>,
}

impl AdapterRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a provider under its own id, replacing any previous one
	pub fn register(&mut self, provider: Arc<dyn RouteProvider>) {
		self.providers.insert(provider.id().to_string(), provider);
	}

	pub fn with(mut self, provider: Arc<dyn RouteProvider>) -> Self {
		self.register(provider);
		self
	}

	pub fn get(&self, id: &str) -> Option<Arc<dyn RouteProvider>> {
		self.providers.get(id).cloned()
	}

	/// All providers, ordered by id
	pub fn route_providers(&self) -> Vec<Arc<dyn RouteProvider>> {
		self.providers.values().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.providers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.providers.is_empty()
	}
}
