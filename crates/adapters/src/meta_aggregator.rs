//! Swap meta-aggregator
//!
//! Asks every registered [`SwapQuoteProvider`] for the same swap concurrently and
//! returns the answers best first. A provider that fails or exceeds its timeout is
//! left out; it does not fail the whole request.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use usdc_types::adapters::{SwapQuote, SwapQuoteRequest};
use usdc_types::{AdapterError, SwapQuoteProvider};

/// Outcome of one provider within a fan-out
#[derive(Debug)]
pub enum ProviderOutcome {
	Quoted(SwapQuote),
	NoLiquidity,
	Failed(AdapterError),
	TimedOut,
}

#[derive(Debug, Default)]
pub struct AggregatedQuotes {
	/// Highest `buy_amount` first
	pub quotes: Vec<SwapQuote>,
	/// Provider id and reason for every provider that produced no quote
	pub failures: Vec<(String, String)>,
}

impl AggregatedQuotes {
	pub fn best(&self) -> Option<&SwapQuote> {
		self.quotes.first()
	}
}

#[derive(Debug, Clone)]
pub struct MetaAggregator {
	providers: Vec<Arc<dyn SwapQuoteProvider>>,
	provider_timeout: Duration,
}

impl MetaAggregator {
	pub fn new(providers: Vec<Arc<dyn SwapQuoteProvider>>, provider_timeout_ms: u64) -> Self {
		Self {
			providers,
			provider_timeout: Duration::from_millis(provider_timeout_ms),
		}
	}

	pub fn provider_ids(&self) -> Vec<&str> {
		self.providers.iter().map(|p| p.id()).collect()
	}

	async fn ask(
		provider: Arc<dyn SwapQuoteProvider>,
		request: &SwapQuoteRequest,
		limit: Duration,
	) -> ProviderOutcome {
		match timeout(limit, provider.fetch_swap_quote(request)).await {
			Ok(Ok(Some(quote))) => ProviderOutcome::Quoted(quote),
			Ok(Ok(None)) => ProviderOutcome::NoLiquidity,
			Ok(Err(e)) => ProviderOutcome::Failed(e),
			Err(_) => ProviderOutcome::TimedOut,
		}
	}

	/// Fan out to every provider and collect quotes, best first
	pub async fn fetch_quotes(&self, request: &SwapQuoteRequest) -> AggregatedQuotes {
		info!(
			"Fetching swap quotes on chain {} from {} providers",
			request.chain_id,
			self.providers.len()
		);

		let tasks = self.providers.iter().map(|provider| {
			let provider = Arc::clone(provider);
			let limit = self.provider_timeout;
			async move {
				let id = provider.id().to_string();
				debug!("Starting swap quote fetch from {}", id);
				(id, Self::ask(provider, request, limit).await)
			}
		});

		let mut result = AggregatedQuotes::default();
		for (id, outcome) in join_all(tasks).await {
			match outcome {
				ProviderOutcome::Quoted(quote) => result.quotes.push(quote),
				ProviderOutcome::NoLiquidity => {
					result.failures.push((id, "no liquidity".to_string()));
				},
				ProviderOutcome::Failed(e) => {
					warn!("Swap provider {} returned error: {}", id, e);
					result.failures.push((id, e.to_string()));
				},
				ProviderOutcome::TimedOut => {
					warn!(
						"Swap provider {} timed out after {}ms",
						id,
						self.provider_timeout.as_millis()
					);
					result.failures.push((id, "timeout".to_string()));
				},
			}
		}

		// Ties keep the cheaper gas estimate first
		result.quotes.sort_by(|a, b| {
			b.buy_amount.cmp(&a.buy_amount).then_with(|| {
				a.gas_estimate
					.unwrap_or(u64::MAX)
					.cmp(&b.gas_estimate.unwrap_or(u64::MAX))
			})
		});

		info!(
			"Swap aggregation completed: {} quotes from {} providers",
			result.quotes.len(),
			self.providers.len()
		);
		result
	}
}
