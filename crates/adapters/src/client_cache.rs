//! HTTP client cache for provider adapters
//!
//! One pooled `reqwest::Client` per distinct provider configuration (base URL,
//! headers, auth and timeout), recreated after a TTL.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use usdc_types::{AdapterError, AdapterResult, ProviderConfig, SecretString};

/// Configuration for creating pooled HTTP clients
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientConfig {
	pub base_url: String,
	/// Provider identifier for cache differentiation
	pub provider_id: String,
	pub max_idle_per_host: usize,
	pub keep_alive_timeout_ms: u64,
	/// Whole-request timeout
	pub request_timeout_ms: u64,
	/// Default headers (content type, auth, provider-specific)
	pub headers: Vec<(String, String)>,
}

impl From<&ProviderConfig> for ClientConfig {
	fn from(provider: &ProviderConfig) -> Self {
		let mut headers = vec![
			("User-Agent".to_string(), "usdc-router/0.1".to_string()),
			("Accept".to_string(), "application/json".to_string()),
		];
		let mut extra: Vec<(String, String)> = provider
			.headers
			.iter()
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect();
		// HashMap order is random; keep the cache key stable
		extra.sort();
		headers.extend(extra);

		Self {
			base_url: provider.base_url.clone(),
			provider_id: provider.provider_id.clone(),
			max_idle_per_host: 10,
			keep_alive_timeout_ms: 90_000,
			request_timeout_ms: provider.timeout_ms,
			headers,
		}
	}
}

/// How a provider expects its API key
#[derive(Debug, Clone)]
pub enum AuthConfig {
	None,
	Bearer { token: SecretString },
	ApiKey { header: String, key: SecretString },
}

impl AuthConfig {
	/// API key under `header` when the provider has one configured
	pub fn api_key_header(header: &str, key: Option<&SecretString>) -> Self {
		match key {
			Some(key) => Self::ApiKey {
				header: header.to_string(),
				key: key.clone(),
			},
			None => Self::None,
		}
	}
}

#[derive(Debug, Clone)]
struct CachedClient {
	client: Arc<Client>,
	created_at: Instant,
}

impl CachedClient {
	fn new(client: Client) -> Self {
		Self {
			client: Arc::new(client),
			created_at: Instant::now(),
		}
	}

	fn is_expired(&self, ttl: Duration) -> bool {
		self.created_at.elapsed() > ttl
	}
}

/// Thread-safe cache of HTTP clients keyed by provider configuration with TTL
#[derive(Clone, Debug)]
pub struct ClientCache {
	clients: Arc<DashMap<ClientConfig, CachedClient>>,
	ttl: Duration,
}

impl ClientCache {
	/// Create a new client cache with default 30-minute TTL
	pub fn new() -> Self {
		Self::with_ttl(Duration::from_secs(30 * 60))
	}

	pub fn with_ttl(ttl: Duration) -> Self {
		Self {
			clients: Arc::new(DashMap::new()),
			ttl,
		}
	}

	/// Get or create a client for the given configuration
	pub fn get_client(&self, config: &ClientConfig) -> AdapterResult<Arc<Client>> {
		self.clients.remove_if(config, |_, cached| {
			let expired = cached.is_expired(self.ttl);
			if expired {
				warn!(
					"Client cache expired for {} (age: {:?}), will create new client",
					config.base_url,
					cached.created_at.elapsed()
				);
			}
			expired
		});

		if let Some(cached) = self.clients.get(config) {
			return Ok(cached.client.clone());
		}

		debug!("Creating new client for {}", config.provider_id);
		let cached = CachedClient::new(Self::build_client(config)?);

		match self.clients.entry(config.clone()) {
			// Another task created one first; use that
			Entry::Occupied(entry) => Ok(entry.get().client.clone()),
			Entry::Vacant(entry) => {
				let client = cached.client.clone();
				entry.insert(cached);
				Ok(client)
			},
		}
	}

	/// Get or create a client for a provider, applying its auth scheme
	pub fn get_client_with_auth(
		&self,
		provider: &ProviderConfig,
		auth: &AuthConfig,
	) -> AdapterResult<Arc<Client>> {
		let mut config = ClientConfig::from(provider);
		match auth {
			AuthConfig::None => {},
			AuthConfig::Bearer { token } => config.headers.push((
				"Authorization".to_string(),
				format!("Bearer {}", token.expose_secret()),
			)),
			AuthConfig::ApiKey { header, key } => config
				.headers
				.push((header.clone(), key.expose_secret().to_string())),
		}
		self.get_client(&config)
	}

	fn build_client(config: &ClientConfig) -> AdapterResult<Client> {
		let mut header_map = reqwest::header::HeaderMap::new();
		for (key, value) in &config.headers {
			match (
				reqwest::header::HeaderName::from_bytes(key.as_bytes()),
				reqwest::header::HeaderValue::from_str(value),
			) {
				(Ok(name), Ok(value)) => {
					header_map.insert(name, value);
				},
				_ => warn!("Skipping invalid header {} for {}", key, config.provider_id),
			}
		}

		ClientBuilder::new()
			.pool_max_idle_per_host(config.max_idle_per_host)
			.pool_idle_timeout(Duration::from_millis(config.keep_alive_timeout_ms))
			.tcp_keepalive(Duration::from_secs(60))
			.timeout(Duration::from_millis(config.request_timeout_ms))
			.default_headers(header_map)
			.build()
			.map_err(AdapterError::Http)
	}

	/// Remove all expired clients; returns how many were dropped
	pub fn cleanup_expired(&self) -> usize {
		let before = self.clients.len();
		self.clients.retain(|_, cached| !cached.is_expired(self.ttl));
		let removed = before.saturating_sub(self.clients.len());
		if removed > 0 {
			debug!("Cleaned up {} expired clients from cache", removed);
		}
		removed
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}
}

impl Default for ClientCache {
	fn default() -> Self {
		Self::new()
	}
}
