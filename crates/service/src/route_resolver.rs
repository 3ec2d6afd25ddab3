//! Route resolution across providers
//!
//! Validates a [`RouteRequest`], fans out to every provider that serves both
//! chains, races the fan-out against a deadline and writes the outcome into the
//! route caches. Failures are classified and recorded on the cache row as well
//! as returned.

use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use usdc_storage::KeyedCache;
use usdc_types::models::AmountValidationError;
use usdc_types::{
	classify, Amount, AmountValidation, AssetConfig, BridgeError, CacheRow, ErrorKind, FetchTicket,
	Route, RouteProvider, RouteQuery, RouteRequest, RouteSet,
};

pub const DEFAULT_ROUTE_TIMEOUT_MS: u64 = 45_000;

const ABANDONED_MESSAGE: &str = "Route request was abandoned";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
	#[error("amount rejected: {0:?}")]
	Validation(AmountValidation),

	#[error(transparent)]
	Classified(#[from] BridgeError),
}

impl ResolveError {
	/// User-facing form of the failure
	pub fn to_bridge_error(&self) -> BridgeError {
		match self {
			ResolveError::Classified(err) => err.clone(),
			ResolveError::Validation(validation) => match validation.error {
				Some(AmountValidationError::TooLow) => BridgeError::new(ErrorKind::AmountTooLow)
					.with_message(format!(
						"Minimum amount is {}",
						validation.min_amount.as_deref().unwrap_or("unknown")
					)),
				Some(AmountValidationError::TooHigh) => BridgeError::new(ErrorKind::AmountTooHigh)
					.with_message(format!(
						"Maximum amount is {}",
						validation.max_amount.as_deref().unwrap_or("unknown")
					)),
				_ => BridgeError::new(ErrorKind::Unknown)
					.with_title("Invalid amount")
					.with_message("The amount must be greater than zero.")
					.with_suggestion("Enter an amount greater than zero."),
			},
		}
	}
}

/// Per-call switches
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
	/// Start a new fetch even when one is in flight; the older result is then discarded
	pub force_refresh: bool,
	pub cancel: Option<CancellationToken>,
}

pub struct RouteResolver {
	providers: Vec<Arc<dyn RouteProvider>>,
	/// Keyed by upper-cased symbol
	assets: HashMap<String, AssetConfig>,
	route_sets: KeyedCache<RouteSet, BridgeError>,
	routes: KeyedCache<Route, BridgeError>,
	timeout: Duration,
}

impl RouteResolver {
	pub fn new(providers: Vec<Arc<dyn RouteProvider>>, assets: Vec<AssetConfig>) -> Self {
		Self {
			providers,
			assets: assets
				.into_iter()
				.map(|asset| (asset.symbol.to_uppercase(), asset))
				.collect(),
			route_sets: KeyedCache::new(),
			routes: KeyedCache::new(),
			timeout: Duration::from_millis(DEFAULT_ROUTE_TIMEOUT_MS),
		}
	}

	pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.timeout = Duration::from_millis(timeout_ms);
		self
	}

	/// Use caches owned elsewhere (e.g. shared with a UI layer)
	pub fn with_caches(
		mut self,
		route_sets: KeyedCache<RouteSet, BridgeError>,
		routes: KeyedCache<Route, BridgeError>,
	) -> Self {
		self.route_sets = route_sets;
		self.routes = routes;
		self
	}

	/// Rows keyed by [`RouteRequest::cache_key`]
	pub fn route_sets(&self) -> &KeyedCache<RouteSet, BridgeError> {
		&self.route_sets
	}

	/// Rows keyed by [`RouteSet::route_key`]
	pub fn routes(&self) -> &KeyedCache<Route, BridgeError> {
		&self.routes
	}

	pub fn asset(&self, symbol: &str) -> Option<&AssetConfig> {
		self.assets.get(&symbol.to_uppercase())
	}

	/// Check the request against the asset's bounds and chains, producing a provider query
	pub fn validate(&self, request: &RouteRequest) -> Result<RouteQuery, ResolveError> {
		let asset = self.asset(&request.asset).ok_or_else(|| {
			BridgeError::new(ErrorKind::ChainNotSupported)
				.with_message(format!("{} is not a supported asset", request.asset))
		})?;

		let validation = asset.validate_amount(request.amount);
		if !validation.is_valid {
			return Err(ResolveError::Validation(validation));
		}

		let token_on = |chain_id: u64| {
			asset.address_on(chain_id).ok_or_else(|| {
				BridgeError::new(ErrorKind::ChainNotSupported).with_message(format!(
					"{} is not available on chain {}",
					asset.symbol, chain_id
				))
			})
		};

		Ok(RouteQuery {
			from_chain: request.from_chain,
			to_chain: request.to_chain,
			from_token: token_on(request.from_chain)?,
			to_token: token_on(request.to_chain)?,
			amount: Amount::new(request.amount.into_raw()),
			from_address: request.from_address,
			to_address: request.recipient(),
			slippage_bps: request.slippage_bps,
		})
	}

	pub async fn resolve_routes(&self, request: &RouteRequest) -> Result<RouteSet, ResolveError> {
		self.resolve_with(request, ResolveOptions::default()).await
	}

	/// Resolve routes, joining a fetch already in flight for the same key unless forced
	pub async fn resolve_with(
		&self,
		request: &RouteRequest,
		options: ResolveOptions,
	) -> Result<RouteSet, ResolveError> {
		let query = self.validate(request)?;
		let key = request.cache_key();

		if !options.force_refresh && self.route_sets.in_flight(&key).is_some() {
			debug!("Joining in-flight route fetch for {}", key);
			match timeout(self.timeout, self.route_sets.wait_settled(&key)).await {
				Ok(row) => {
					if let Some(result) = row.and_then(settled) {
						return result;
					}
				},
				Err(_) => warn!(
					"In-flight route fetch for {} did not settle within {}ms, fetching again",
					key,
					self.timeout.as_millis()
				),
			}
		}

		let mut pending = PendingFetch {
			cache: &self.route_sets,
			ticket: self.route_sets.begin_fetch(&key, None),
			settled: false,
		};
		let result = self.fetch_all(&query, options.cancel).await;
		pending.settled = true;

		match result {
			Ok(routes) => {
				let set = RouteSet::new(key.clone(), routes);
				if self.route_sets.resolve(&pending.ticket, set.clone()) {
					self.store_routes(&set);
				}
				info!(
					"Resolved {} routes for {} -> {} ({})",
					set.routes.len(),
					request.from_chain,
					request.to_chain,
					key
				);
				Ok(set)
			},
			Err(err) => {
				self.route_sets.reject(&pending.ticket, err.clone());
				Err(err.into())
			},
		}
	}

	/// Write per-route rows and prune siblings the new set no longer contains
	fn store_routes(&self, set: &RouteSet) {
		let keep: HashSet<String> = set
			.routes
			.iter()
			.map(|route| RouteSet::route_key(&set.request_key, &route.id))
			.collect();
		for route in &set.routes {
			self.routes.insert_resolved(
				&RouteSet::route_key(&set.request_key, &route.id),
				route.clone(),
			);
		}

		let prefix = format!("{}:", set.request_key);
		let pruned = self.routes.remove_where(&prefix, |key| keep.contains(key));
		if !pruned.is_empty() {
			debug!("Pruned {} stale routes for {}", pruned.len(), set.request_key);
		}
	}

	async fn fetch_all(
		&self,
		query: &RouteQuery,
		cancel: Option<CancellationToken>,
	) -> Result<Vec<Route>, BridgeError> {
		let providers: Vec<&Arc<dyn RouteProvider>> = self
			.providers
			.iter()
			.filter(|p| p.supports_chain(query.from_chain) && p.supports_chain(query.to_chain))
			.collect();
		if providers.is_empty() {
			return Err(BridgeError::new(ErrorKind::ChainNotSupported).with_message(format!(
				"No provider serves {} -> {}",
				query.from_chain, query.to_chain
			)));
		}

		let tasks = providers.iter().map(|provider| async move {
			debug!("Fetching routes from {}", provider.id());
			(provider.id().to_string(), provider.fetch_routes(query).await)
		});

		let cancel = cancel.unwrap_or_default();
		let timeout_ms = self.timeout.as_millis();
		// Dropping the losing branch aborts every outstanding provider request
		let results = tokio::select! {
			results = timeout(self.timeout, join_all(tasks)) => match results {
				Ok(results) => results,
				Err(_) => {
					warn!("Route request timed out after {}ms", timeout_ms);
					return Err(BridgeError::new(ErrorKind::Network)
						.with_message(format!("Route request timed out after {}ms", timeout_ms)));
				},
			},
			_ = cancel.cancelled() => {
				return Err(BridgeError::new(ErrorKind::Network)
					.with_message("Route request was cancelled"));
			},
		};

		let mut routes = Vec::new();
		let mut first_error = None;
		for (provider_id, result) in results {
			match result {
				Ok(found) => {
					debug!("{} returned {} routes", provider_id, found.len());
					routes.extend(found.into_iter().map(Route::normalized));
				},
				Err(e) => {
					warn!("Route provider {} failed: {}", provider_id, e);
					first_error.get_or_insert_with(|| classify(&e));
				},
			}
		}

		if routes.is_empty() {
			return Err(first_error.unwrap_or_else(|| BridgeError::new(ErrorKind::NoRoutes)));
		}

		// Most received first, then fastest
		routes.sort_by(|a, b| {
			b.to_amount
				.cmp(&a.to_amount)
				.then(a.estimated_duration_seconds.cmp(&b.estimated_duration_seconds))
		});
		Ok(routes)
	}
}

/// Fetch owned by one caller; rejected on drop unless the caller settled it
struct PendingFetch<'a> {
	cache: &'a KeyedCache<RouteSet, BridgeError>,
	ticket: FetchTicket,
	settled: bool,
}

impl Drop for PendingFetch<'_> {
	fn drop(&mut self) {
		if self.settled {
			return;
		}
		debug!("Route fetch for {} abandoned by its caller", self.ticket.key);
		self.cache.reject(
			&self.ticket,
			BridgeError::new(ErrorKind::Network).with_message(ABANDONED_MESSAGE),
		);
	}
}

/// Result carried by a settled row, if it carries one.
///
/// An abandoned fetch carries nothing; joiners start their own.
fn settled(row: CacheRow<RouteSet, BridgeError>) -> Option<Result<RouteSet, ResolveError>> {
	if let Some(err) = row.error {
		if err.message == ABANDONED_MESSAGE {
			return None;
		}
		return Some(Err(err.into()));
	}
	row.data.map(Ok)
}
