//! Route requests and normalized routes
//!
//! A [`RouteRequest`] is what a caller asks for. The resolver validates it into a
//! [`RouteQuery`] that adapters consume, and adapters answer with [`Route`]s whose
//! amounts are already converted to [`Amount`].

use crate::cache::CacheKeyBuilder;
use crate::models::Amount;
use alloy_primitives::{Address, Bytes, I256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default slippage tolerance (0.5%)
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;

/// Caller-facing route request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
	pub from_chain: u64,
	pub to_chain: u64,
	/// Asset symbol as configured (e.g., "USDC")
	pub asset: String,
	/// Signed so that zero and negative input can be reported rather than rejected at parse time
	pub amount: I256,
	pub from_address: Address,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to_address: Option<Address>,
	#[serde(default = "default_slippage_bps")]
	pub slippage_bps: u32,
}

fn default_slippage_bps() -> u32 {
	DEFAULT_SLIPPAGE_BPS
}

impl RouteRequest {
	pub fn new(
		from_chain: u64,
		to_chain: u64,
		asset: impl Into<String>,
		amount: I256,
		from_address: Address,
	) -> Self {
		Self {
			from_chain,
			to_chain,
			asset: asset.into(),
			amount,
			from_address,
			to_address: None,
			slippage_bps: DEFAULT_SLIPPAGE_BPS,
		}
	}

	pub fn with_recipient(mut self, to_address: Address) -> Self {
		self.to_address = Some(to_address);
		self
	}

	pub fn with_slippage_bps(mut self, slippage_bps: u32) -> Self {
		self.slippage_bps = slippage_bps;
		self
	}

	pub fn recipient(&self) -> Address {
		self.to_address.unwrap_or(self.from_address)
	}

	/// Deterministic key: lower-cased symbol and addresses, decimal amount
	pub fn cache_key(&self) -> String {
		CacheKeyBuilder::new("routes")
			.segment(self.from_chain)
			.segment(self.to_chain)
			.segment(&self.asset)
			.segment(self.amount)
			.address(&self.from_address)
			.address(&self.recipient())
			.segment(self.slippage_bps)
			.build()
	}
}

/// Validated request handed to route providers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteQuery {
	pub from_chain: u64,
	pub to_chain: u64,
	pub from_token: Address,
	pub to_token: Address,
	pub amount: Amount,
	pub from_address: Address,
	pub to_address: Address,
	pub slippage_bps: u32,
}

impl RouteQuery {
	/// Slippage as the fraction providers expect (50 bps -> 0.005)
	pub fn slippage_fraction(&self) -> f64 {
		f64::from(self.slippage_bps) / 10_000.0
	}
}

/// Unsigned transaction as returned by a provider or built locally
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TxRequest {
	pub chain_id: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from: Option<Address>,
	pub to: Address,
	#[serde(default)]
	pub data: Bytes,
	#[serde(default)]
	pub value: Amount,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas_limit: Option<u64>,
}

/// One hop of a route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
	/// "swap", "cross", "protocol" or a provider-specific label
	pub step_type: String,
	/// Bridge or DEX that executes the step
	pub tool: String,
	pub from_chain_id: u64,
	pub to_chain_id: u64,
	pub from_amount: Amount,
	pub to_amount: Amount,
	pub estimated_duration_seconds: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub transaction: Option<TxRequest>,
}

/// A normalized route from any provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Route {
	pub id: String,
	/// Adapter that produced the route
	pub provider: String,
	pub from_chain_id: u64,
	pub to_chain_id: u64,
	pub from_amount: Amount,
	pub to_amount: Amount,
	pub to_amount_min: Amount,
	pub steps: Vec<RouteStep>,
	pub gas_cost_usd: f64,
	pub estimated_duration_seconds: u64,
	#[serde(default)]
	pub tags: Vec<String>,
}

impl Route {
	/// Clamp `to_amount_min` so it never exceeds `to_amount`
	pub fn normalized(mut self) -> Self {
		if self.to_amount_min > self.to_amount {
			self.to_amount_min = self.to_amount;
		}
		self
	}

	pub fn has_tag(&self, tag: &str) -> bool {
		self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
	}

	/// Transactions of all steps that carry one, in execution order
	pub fn transactions(&self) -> impl Iterator<Item = &TxRequest> {
		self.steps.iter().filter_map(|step| step.transaction.as_ref())
	}
}

/// Resolved routes for one request key plus aggregate bounds for UI guidance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteSet {
	pub request_key: String,
	pub routes: Vec<Route>,
	pub min_from_amount: Option<Amount>,
	pub max_from_amount: Option<Amount>,
	pub fetched_at: DateTime<Utc>,
}

impl RouteSet {
	pub fn new(request_key: String, routes: Vec<Route>) -> Self {
		let min_from_amount = routes.iter().map(|r| r.from_amount).min();
		let max_from_amount = routes.iter().map(|r| r.from_amount).max();
		Self {
			request_key,
			routes,
			min_from_amount,
			max_from_amount,
			fetched_at: Utc::now(),
		}
	}

	/// Cache key of the per-route row
	pub fn route_key(request_key: &str, route_id: &str) -> String {
		format!("{}:{}", request_key, route_id)
	}

	pub fn best(&self) -> Option<&Route> {
		self.routes.first()
	}
}
