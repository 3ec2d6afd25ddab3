//! Configuration settings structures

use crate::configurable_value::{ConfigurableValue, ConfigurableValueError};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use usdc_types::models::parse_chain_id;
use usdc_types::{Amount, AssetConfig, ProviderConfig, SecretString};

/// Main application settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
	pub providers: ProvidersSettings,
	pub timeouts: TimeoutSettings,
	/// Keyed by lowercase symbol
	pub assets: HashMap<String, AssetSettings>,
	/// Keyed by chain id (decimal or hex string)
	pub chains: HashMap<String, ChainSettings>,
	pub session: SessionSettings,
	pub retry: RetrySettings,
	pub environment: EnvironmentSettings,
	pub logging: LoggingSettings,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
	#[error("invalid chain id key '{0}'")]
	InvalidChainId(String),

	#[error("invalid URL for {field}: {value}")]
	InvalidUrl { field: String, value: String },

	#[error("invalid token address for {symbol} on chain {chain}: {value}")]
	InvalidAddress {
		symbol: String,
		chain: String,
		value: String,
	},

	#[error("asset {0}: min_amount exceeds max_amount")]
	InvertedBounds(String),

	#[error("timeout {0} must be greater than zero")]
	ZeroTimeout(&'static str),

	#[error("retry.max_attempts must be at least 1")]
	ZeroAttempts,

	#[error(transparent)]
	Secret(#[from] ConfigurableValueError),
}

/// Upstream provider endpoints and credentials
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProvidersSettings {
	pub lifi: LifiSettings,
	pub cctp: EndpointSettings,
	pub gateway: GatewaySettings,
	pub uniswap: UniswapSettings,
	pub zeroex: ApiSettings,
	pub signatures: SignatureSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EndpointSettings {
	pub base_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiSettings {
	pub base_url: String,
	#[serde(default)]
	pub api_key: Option<ConfigurableValue>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LifiSettings {
	pub base_url: String,
	#[serde(default)]
	pub api_key: Option<ConfigurableValue>,
	/// Sent as `integrator` on every request
	#[serde(default)]
	pub integrator: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewaySettings {
	pub base_url: String,
	#[serde(default)]
	pub testnet: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct UniswapSettings {
	/// Subgraph URL per chain id
	#[serde(default)]
	pub subgraphs: HashMap<String, String>,
	#[serde(default)]
	pub api_key: Option<ConfigurableValue>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SignatureSettings {
	pub fourbyte_url: String,
	pub openchain_url: String,
}

/// Timeout configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TimeoutSettings {
	/// Whole route resolution across all providers
	pub route_ms: u64,
	/// Single provider HTTP request
	pub provider_ms: u64,
	/// Whole simulation batch
	pub simulation_ms: u64,
}

/// Asset with its accepted amount range, amounts in smallest units
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AssetSettings {
	pub symbol: String,
	pub decimals: u8,
	pub min_amount: Amount,
	pub max_amount: Amount,
	/// Token address per chain id
	#[serde(default)]
	pub addresses: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChainSettings {
	pub name: String,
	pub rpc_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SessionSettings {
	/// A simulation older than this must be re-run before submit
	pub simulation_max_age_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RetrySettings {
	pub max_attempts: u32,
}

/// Environment-specific settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct EnvironmentSettings {
	pub profile: EnvironmentProfile,
	pub debug: bool,
}

/// Environment profiles
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentProfile {
	Development,
	Staging,
	Production,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
	pub level: String,
	pub format: LogFormat,
	/// Include targets, thread ids and span events
	pub structured: bool,
}

/// Log format options
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Json,
	Pretty,
	Compact,
}

impl Default for ProvidersSettings {
	fn default() -> Self {
		Self {
			lifi: LifiSettings {
				base_url: "https://li.quest/v1".to_string(),
				api_key: None,
				integrator: None,
			},
			cctp: EndpointSettings {
				base_url: "https://iris-api.circle.com".to_string(),
			},
			gateway: GatewaySettings {
				base_url: "https://gateway-api.circle.com".to_string(),
				testnet: false,
			},
			uniswap: UniswapSettings::default(),
			zeroex: ApiSettings {
				base_url: "https://api.0x.org".to_string(),
				api_key: Some(ConfigurableValue::from_env("ZEROEX_API_KEY")),
			},
			signatures: SignatureSettings {
				fourbyte_url: "https://www.4byte.directory".to_string(),
				openchain_url: "https://api.openchain.xyz".to_string(),
			},
		}
	}
}

impl Default for TimeoutSettings {
	fn default() -> Self {
		Self {
			route_ms: 45_000,
			provider_ms: 15_000,
			simulation_ms: 60_000,
		}
	}
}

impl Default for SessionSettings {
	fn default() -> Self {
		Self {
			simulation_max_age_secs: 300,
		}
	}
}

impl Default for RetrySettings {
	fn default() -> Self {
		Self { max_attempts: 3 }
	}
}

impl Default for EnvironmentSettings {
	fn default() -> Self {
		Self {
			profile: EnvironmentProfile::Development,
			debug: true,
		}
	}
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Pretty,
			structured: false,
		}
	}
}

impl From<&AssetConfig> for AssetSettings {
	fn from(asset: &AssetConfig) -> Self {
		Self {
			symbol: asset.symbol.clone(),
			decimals: asset.decimals,
			min_amount: asset.min_amount,
			max_amount: asset.max_amount,
			addresses: asset
				.addresses
				.iter()
				.map(|(chain, address)| (chain.to_string(), address.to_checksum(None)))
				.collect(),
		}
	}
}

impl AssetSettings {
	pub fn to_asset_config(&self) -> Result<AssetConfig, ConfigValidationError> {
		if self.min_amount > self.max_amount {
			return Err(ConfigValidationError::InvertedBounds(self.symbol.clone()));
		}
		let mut addresses = BTreeMap::new();
		for (chain, value) in &self.addresses {
			let chain_id = parse_chain_id(chain)
				.ok_or_else(|| ConfigValidationError::InvalidChainId(chain.clone()))?;
			let address = value.parse::<Address>().map_err(|_| {
				ConfigValidationError::InvalidAddress {
					symbol: self.symbol.clone(),
					chain: chain.clone(),
					value: value.clone(),
				}
			})?;
			addresses.insert(chain_id, address);
		}
		Ok(AssetConfig {
			symbol: self.symbol.clone(),
			decimals: self.decimals,
			min_amount: self.min_amount,
			max_amount: self.max_amount,
			addresses,
		})
	}
}

fn resolve_key(
	value: &Option<ConfigurableValue>,
) -> Result<Option<SecretString>, ConfigurableValueError> {
	match value {
		None => Ok(None),
		Some(value) => match value.resolve() {
			Ok(secret) => Ok(Some(secret)),
			// An unset optional key means unauthenticated access
			Err(ConfigurableValueError::EnvironmentVariableNotFound(name)) => {
				tracing::debug!("API key variable {} is not set, continuing without it", name);
				Ok(None)
			},
			Err(e) => Err(e),
		},
	}
}

fn check_url(field: &str, value: &str) -> Result<(), ConfigValidationError> {
	url::Url::parse(value)
		.map(|_| ())
		.map_err(|_| ConfigValidationError::InvalidUrl {
			field: field.to_string(),
			value: value.to_string(),
		})
}

impl Settings {
	/// Check everything the router builder relies on
	pub fn validate(&self) -> Result<(), ConfigValidationError> {
		if self.timeouts.route_ms == 0 {
			return Err(ConfigValidationError::ZeroTimeout("route_ms"));
		}
		if self.timeouts.provider_ms == 0 {
			return Err(ConfigValidationError::ZeroTimeout("provider_ms"));
		}
		if self.timeouts.simulation_ms == 0 {
			return Err(ConfigValidationError::ZeroTimeout("simulation_ms"));
		}
		if self.retry.max_attempts == 0 {
			return Err(ConfigValidationError::ZeroAttempts);
		}

		let p = &self.providers;
		check_url("providers.lifi.base_url", &p.lifi.base_url)?;
		check_url("providers.cctp.base_url", &p.cctp.base_url)?;
		check_url("providers.gateway.base_url", &p.gateway.base_url)?;
		check_url("providers.zeroex.base_url", &p.zeroex.base_url)?;
		check_url("providers.signatures.fourbyte_url", &p.signatures.fourbyte_url)?;
		check_url("providers.signatures.openchain_url", &p.signatures.openchain_url)?;
		for url in p.uniswap.subgraphs.values() {
			check_url("providers.uniswap.subgraphs", url)?;
		}

		self.rpc_urls()?;
		self.asset_configs()?;
		Ok(())
	}

	/// Configured assets, USDC when none are configured
	pub fn asset_configs(&self) -> Result<Vec<AssetConfig>, ConfigValidationError> {
		if self.assets.is_empty() {
			return Ok(vec![AssetConfig::usdc()]);
		}
		let mut assets = self
			.assets
			.values()
			.map(AssetSettings::to_asset_config)
			.collect::<Result<Vec<_>, _>>()?;
		assets.sort_by(|a, b| a.symbol.cmp(&b.symbol));
		Ok(assets)
	}

	/// RPC endpoint per chain id
	pub fn rpc_urls(&self) -> Result<HashMap<u64, String>, ConfigValidationError> {
		self.chains
			.iter()
			.map(|(key, chain)| {
				let chain_id = parse_chain_id(key)
					.ok_or_else(|| ConfigValidationError::InvalidChainId(key.clone()))?;
				check_url(&format!("chains.{}.rpc_url", key), &chain.rpc_url)?;
				Ok((chain_id, chain.rpc_url.clone()))
			})
			.collect()
	}

	pub fn uniswap_subgraphs(&self) -> Result<HashMap<u64, String>, ConfigValidationError> {
		self.providers
			.uniswap
			.subgraphs
			.iter()
			.map(|(key, url)| {
				parse_chain_id(key)
					.map(|id| (id, url.clone()))
					.ok_or_else(|| ConfigValidationError::InvalidChainId(key.clone()))
			})
			.collect()
	}

	fn provider(&self, id: &str, base_url: &str) -> ProviderConfig {
		ProviderConfig::new(id, base_url).with_timeout_ms(self.timeouts.provider_ms)
	}

	pub fn lifi_config(&self) -> Result<ProviderConfig, ConfigurableValueError> {
		let lifi = &self.providers.lifi;
		Ok(self
			.provider("lifi", &lifi.base_url)
			.with_api_key(resolve_key(&lifi.api_key)?))
	}

	pub fn cctp_config(&self) -> ProviderConfig {
		self.provider("cctp", &self.providers.cctp.base_url)
	}

	pub fn gateway_config(&self) -> ProviderConfig {
		self.provider("gateway", &self.providers.gateway.base_url)
	}

	pub fn zeroex_config(&self) -> Result<ProviderConfig, ConfigurableValueError> {
		let zeroex = &self.providers.zeroex;
		Ok(self
			.provider("zeroex", &zeroex.base_url)
			.with_api_key(resolve_key(&zeroex.api_key)?))
	}

	/// Base URL is unused, each chain has its own subgraph
	pub fn uniswap_config(&self) -> Result<ProviderConfig, ConfigurableValueError> {
		Ok(self
			.provider("uniswap", "")
			.with_api_key(resolve_key(&self.providers.uniswap.api_key)?))
	}

	pub fn fourbyte_config(&self) -> ProviderConfig {
		self.provider("4byte", &self.providers.signatures.fourbyte_url)
	}

	pub fn openchain_config(&self) -> ProviderConfig {
		self.provider("openchain", &self.providers.signatures.openchain_url)
	}

	/// Check if running in production
	pub fn is_production(&self) -> bool {
		self.environment.profile == EnvironmentProfile::Production
	}

	/// Check if debug mode is enabled
	pub fn is_debug(&self) -> bool {
		self.environment.debug && !self.is_production()
	}

	/// Secrets still holding a shipped placeholder
	pub fn insecure_secrets(&self) -> Vec<&'static str> {
		let p = &self.providers;
		[
			("providers.lifi.api_key", &p.lifi.api_key),
			("providers.zeroex.api_key", &p.zeroex.api_key),
			("providers.uniswap.api_key", &p.uniswap.api_key),
		]
		.into_iter()
		.filter(|(_, value)| value.as_ref().is_some_and(|v| v.is_insecure_default()))
		.map(|(name, _)| name)
		.collect()
	}
}
