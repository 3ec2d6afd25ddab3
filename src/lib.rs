//! USDC Router Library
//!
//! Multi-provider USDC routing, fork simulation and session orchestration.
//! [`RouterBuilder`] wires the adapters, caches and services from [`Settings`].

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use usdc_types::{SignatureRegistry, SwapQuoteProvider};

// Core domain types
pub use usdc_types::{
	chrono,
	serde_json,
	Action,
	ActionType,
	AdapterError,
	Amount,
	AssetConfig,
	BridgeError,
	Eip1193Provider,
	ErrorKind,
	Route,
	RouteProvider,
	RouteRequest,
	RouteSet,
	Session,
	SessionError,
	SessionParams,
	SessionStatus,
	SessionStorage,
	SimulationSummary,
	TxPayload,
};

// Service layer
pub use usdc_service::{
	retry_classified, ActionResolver, ForkBackend, JsonRpcForkBackend, ResolveError,
	ResolveOptions, RetryPolicy, RouteResolver, SessionOrchestrator, SessionUpdate,
	SimulationEngine, StaticActionResolver,
};

// Storage layer
pub use usdc_storage::{KeyedCache, MemoryStore};

// Adapters
pub use usdc_adapters::{
	AdapterRegistry, CctpAdapter, ClientCache, FourByteRegistry, GatewayAdapter, LifiAdapter,
	MetaAggregator, OpenChainRegistry, SignatureResolver, UniswapAdapter, ZeroExAdapter,
};

// Config
pub use usdc_config::{load_config, log_service_info, log_startup_complete, Settings};

pub mod models {
	pub use usdc_types::*;
}

pub mod storage {
	pub use usdc_storage::*;
}

pub mod config {
	pub use usdc_config::*;
}

pub mod adapters {
	pub use usdc_adapters::*;
}

pub mod service {
	pub use usdc_service::*;
}

pub use async_trait;
pub use reqwest;

#[derive(Debug, Error)]
pub enum RouterError {
	#[error(transparent)]
	Config(#[from] usdc_config::ConfigValidationError),

	#[error("failed to resolve secret: {0}")]
	Secret(#[from] usdc_config::ConfigurableValueError),

	#[error("failed to initialise logging: {0}")]
	Tracing(String),
}

/// Everything a caller needs, built from one [`Settings`]
#[derive(Clone)]
pub struct Router {
	pub settings: Settings,
	pub registry: AdapterRegistry,
	pub routes: Arc<RouteResolver>,
	pub sessions: Arc<SessionOrchestrator>,
	pub engine: SimulationEngine,
	pub cctp: Arc<CctpAdapter>,
	pub gateway: Arc<GatewayAdapter>,
	pub uniswap: Arc<UniswapAdapter>,
	pub quotes: MetaAggregator,
	pub signatures: SignatureResolver,
	pub retry: RetryPolicy,
}

impl Router {
	/// Resolve routes, retrying classified retryable failures under [`Router::retry`].
	///
	/// Every retry forces a fresh fetch instead of rejoining the failed one.
	pub async fn resolve_routes(&self, request: &RouteRequest) -> Result<RouteSet, BridgeError> {
		retry_classified(&self.retry, |attempt| async move {
			self.routes
				.resolve_with(
					request,
					ResolveOptions {
						force_refresh: attempt > 0,
						cancel: None,
					},
				)
				.await
				.map_err(|e| e.to_bridge_error())
		})
		.await
	}
}

/// Builder for [`Router`]; unset parts come from settings
pub struct RouterBuilder<S = MemoryStore>
where
	S: SessionStorage + Clone + 'static,
{
	settings: Option<Settings>,
	storage: S,
	extra_providers: BTreeMap<String, Arc<dyn RouteProvider>>,
	fork_backend: Option<Arc<dyn ForkBackend>>,
	action_resolver: Option<Arc<dyn ActionResolver>>,
}

impl Default for RouterBuilder<MemoryStore> {
	fn default() -> Self {
		Self::new()
	}
}

impl RouterBuilder<MemoryStore> {
	/// Builder with in-memory session storage
	pub fn new() -> Self {
		Self::with_storage(MemoryStore::new())
	}

	pub fn from_config(settings: Settings) -> Self {
		Self::new().with_settings(settings)
	}
}

impl<S> RouterBuilder<S>
where
	S: SessionStorage + Clone + 'static,
{
	pub fn with_storage(storage: S) -> Self {
		Self {
			settings: None,
			storage,
			extra_providers: BTreeMap::new(),
			fork_backend: None,
			action_resolver: None,
		}
	}

	pub fn with_settings(mut self, settings: Settings) -> Self {
		self.settings = Some(settings);
		self
	}

	pub fn settings(&self) -> Option<&Settings> {
		self.settings.as_ref()
	}

	/// Add a route provider; one with the id of a built-in adapter replaces it
	pub fn with_route_provider(mut self, provider: Arc<dyn RouteProvider>) -> Self {
		self.extra_providers
			.insert(provider.id().to_string(), provider);
		self
	}

	/// Replace the JSON-RPC fork backend
	pub fn with_fork_backend(mut self, backend: Arc<dyn ForkBackend>) -> Self {
		self.fork_backend = Some(backend);
		self
	}

	/// Replace the built-in action-to-transaction encoder
	pub fn with_action_resolver(mut self, resolver: Arc<dyn ActionResolver>) -> Self {
		self.action_resolver = Some(resolver);
		self
	}

	pub fn build(self) -> Result<Router, RouterError> {
		let settings = self.settings.unwrap_or_default();
		settings.validate()?;

		let clients = ClientCache::new();
		let lifi = Arc::new(
			LifiAdapter::with_cache(settings.lifi_config()?, clients.clone())
				.with_integrator(settings.providers.lifi.integrator.clone()),
		);
		let cctp = Arc::new(CctpAdapter::with_cache(settings.cctp_config(), clients.clone()));
		let gateway = Arc::new(
			GatewayAdapter::with_cache(settings.gateway_config(), clients.clone())
				.with_testnet(settings.providers.gateway.testnet),
		);
		let uniswap = Arc::new(UniswapAdapter::with_cache(
			settings.uniswap_config()?,
			settings.uniswap_subgraphs()?,
			clients.clone(),
		));
		let zeroex = Arc::new(ZeroExAdapter::with_cache(settings.zeroex_config()?, clients.clone()));

		let mut registry = AdapterRegistry::new()
			.with(lifi.clone() as Arc<dyn RouteProvider>)
			.with(cctp.clone() as Arc<dyn RouteProvider>);
		for provider in self.extra_providers.into_values() {
			registry.register(provider);
		}

		let quote_providers: Vec<Arc<dyn SwapQuoteProvider>> = vec![lifi, zeroex];
		let quotes = MetaAggregator::new(quote_providers, settings.timeouts.provider_ms);

		let registries: Vec<Arc<dyn SignatureRegistry>> = vec![
			Arc::new(FourByteRegistry::with_cache(settings.fourbyte_config(), clients.clone())),
			Arc::new(OpenChainRegistry::with_cache(settings.openchain_config(), clients)),
		];
		let signatures = SignatureResolver::new(registries);

		let routes = Arc::new(
			RouteResolver::new(registry.route_providers(), settings.asset_configs()?)
				.with_timeout_ms(settings.timeouts.route_ms),
		);

		let backend = self
			.fork_backend
			.unwrap_or_else(|| Arc::new(JsonRpcForkBackend::default()));
		let engine = SimulationEngine::new(backend).with_timeout_ms(settings.timeouts.simulation_ms);

		let action_resolver = match self.action_resolver {
			Some(resolver) => resolver,
			None => {
				let usdc = settings
					.asset_configs()?
					.into_iter()
					.find(|asset| asset.symbol.eq_ignore_ascii_case("USDC"))
					.unwrap_or_else(AssetConfig::usdc);
				Arc::new(StaticActionResolver::new(usdc))
			},
		};

		let sessions = Arc::new(
			SessionOrchestrator::new(
				Arc::new(self.storage),
				action_resolver,
				engine.clone(),
				settings.rpc_urls()?,
			)
			.with_signatures(signatures.clone())
			.with_max_simulation_age_secs(settings.session.simulation_max_age_secs),
		);

		info!(
			"Router built with {} route provider(s) and {} simulation chain(s)",
			registry.len(),
			settings.chains.len()
		);

		Ok(Router {
			retry: RetryPolicy::new(settings.retry.max_attempts),
			settings,
			registry,
			routes,
			sessions,
			engine,
			cctp,
			gateway,
			uniswap,
			quotes,
			signatures,
		})
	}
}

/// Initialize tracing from logging settings; `RUST_LOG` overrides the level
pub fn init_tracing(settings: &Settings) -> Result<(), RouterError> {
	use usdc_config::LogFormat;

	let log_level = &settings.logging.level;
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
	let structured = settings.logging.structured;

	let result = match settings.logging.format {
		LogFormat::Json => tracing_subscriber::fmt()
			.json()
			.with_env_filter(env_filter)
			.with_target(structured)
			.with_thread_ids(structured)
			.try_init(),
		LogFormat::Pretty => tracing_subscriber::fmt()
			.pretty()
			.with_env_filter(env_filter)
			.with_target(structured)
			.with_thread_ids(structured)
			.try_init(),
		LogFormat::Compact => tracing_subscriber::fmt()
			.compact()
			.with_env_filter(env_filter)
			.with_target(structured)
			.with_thread_ids(structured)
			.try_init(),
	};
	result.map_err(|e| RouterError::Tracing(e.to_string()))?;

	info!(
		"Logging configuration applied: level={}, format={:?}, structured={}",
		settings.logging.level, settings.logging.format, settings.logging.structured
	);
	Ok(())
}
