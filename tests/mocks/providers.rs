//! Mock route providers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use usdc_types::{AdapterError, AdapterResult, Amount, Route, RouteProvider, RouteQuery, RouteStep};

/// How the provider answers
#[derive(Debug, Clone)]
pub enum Behavior {
	/// One route per entry, `to_amount = amount - fee`
	Routes(Vec<(String, u64, u64)>),
	/// Upstream HTTP failure with this status
	Status(u16, String),
	Empty,
}

#[derive(Debug, Clone)]
pub struct MockRouteProvider {
	id: String,
	behavior: Behavior,
	delay_ms: u64,
	chains: Option<Vec<u64>>,
	/// Leading calls answered with a gateway timeout
	failures: usize,
	calls: Arc<AtomicUsize>,
}

impl MockRouteProvider {
	pub fn new(id: &str, behavior: Behavior) -> Self {
		Self {
			id: id.to_string(),
			behavior,
			delay_ms: 0,
			chains: None,
			failures: 0,
			calls: Arc::new(AtomicUsize::new(0)),
		}
	}

	/// Single route `{id}-route` charging `fee` and taking `seconds`
	pub fn success(id: &str, fee: u64, seconds: u64) -> Self {
		Self::new(id, Behavior::Routes(vec![(format!("{}-route", id), fee, seconds)]))
	}

	pub fn failing(id: &str, status: u16, body: &str) -> Self {
		Self::new(id, Behavior::Status(status, body.to_string()))
	}

	pub fn empty(id: &str) -> Self {
		Self::new(id, Behavior::Empty)
	}

	pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
		self.delay_ms = delay_ms;
		self
	}

	pub fn with_failures(mut self, failures: usize) -> Self {
		self.failures = failures;
		self
	}

	pub fn with_chains(mut self, chains: Vec<u64>) -> Self {
		self.chains = Some(chains);
		self
	}

	pub fn call_count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	fn route(&self, query: &RouteQuery, id: &str, fee: u64, seconds: u64) -> Route {
		let to_amount = query.amount.saturating_sub(Amount::from(fee));
		Route {
			id: id.to_string(),
			provider: self.id.clone(),
			from_chain_id: query.from_chain,
			to_chain_id: query.to_chain,
			from_amount: query.amount,
			to_amount,
			// Deliberately above to_amount; the resolver clamps it
			to_amount_min: query.amount,
			steps: vec![RouteStep {
				step_type: "cross".to_string(),
				tool: self.id.clone(),
				from_chain_id: query.from_chain,
				to_chain_id: query.to_chain,
				from_amount: query.amount,
				to_amount,
				estimated_duration_seconds: seconds,
				transaction: None,
			}],
			gas_cost_usd: 0.1,
			estimated_duration_seconds: seconds,
			tags: vec![],
		}
	}
}

#[async_trait]
impl RouteProvider for MockRouteProvider {
	fn id(&self) -> &str {
		&self.id
	}

	fn supports_chain(&self, chain_id: u64) -> bool {
		self.chains
			.as_ref()
			.map_or(true, |chains| chains.contains(&chain_id))
	}

	async fn fetch_routes(&self, query: &RouteQuery) -> AdapterResult<Vec<Route>> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst);
		if self.delay_ms > 0 {
			tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
		}
		if call < self.failures {
			return Err(AdapterError::provider(&self.id, 504, "gateway timed out"));
		}
		match &self.behavior {
			Behavior::Routes(routes) => Ok(routes
				.iter()
				.map(|(id, fee, seconds)| self.route(query, id, *fee, *seconds))
				.collect()),
			Behavior::Status(status, body) => Err(AdapterError::provider(&self.id, *status, body)),
			Behavior::Empty => Ok(vec![]),
		}
	}
}
