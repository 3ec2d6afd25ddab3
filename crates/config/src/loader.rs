//! Configuration loading utilities

use crate::settings::ConfigValidationError;
use crate::Settings;
use config::{Config, ConfigError, Environment, File};
use thiserror::Error;

/// Default config file, extension picked up by `config`
pub const DEFAULT_CONFIG_PATH: &str = "config/config";

/// `USDC_ROUTER__TIMEOUTS__ROUTE_MS=1000` overrides `timeouts.route_ms`
pub const ENV_PREFIX: &str = "USDC_ROUTER";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
	#[error("failed to read configuration: {0}")]
	Config(#[from] ConfigError),

	#[error("invalid configuration: {0}")]
	Validation(#[from] ConfigValidationError),
}

/// Load `config/config.*` (optional) with environment overrides
pub fn load_config() -> Result<Settings, ConfigLoadError> {
	let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
	load_config_from(&path)
}

pub fn load_config_from(path: &str) -> Result<Settings, ConfigLoadError> {
	let s = Config::builder()
		.add_source(File::with_name(path).required(false))
		.add_source(
			Environment::with_prefix(ENV_PREFIX)
				.separator("__")
				.try_parsing(true),
		)
		.build()?;

	let settings: Settings = s.try_deserialize()?;
	settings.validate()?;
	Ok(settings)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn write_config(name: &str, body: &str) -> std::path::PathBuf {
		let path = std::env::temp_dir().join(format!("{}-{}.toml", name, std::process::id()));
		let mut file = std::fs::File::create(&path).unwrap();
		file.write_all(body.as_bytes()).unwrap();
		path
	}

	#[test]
	fn test_missing_file_yields_defaults() {
		let settings = load_config_from("/nonexistent/usdc-router").unwrap();
		assert_eq!(settings.timeouts.route_ms, 45_000);
		assert_eq!(settings.providers.cctp.base_url, "https://iris-api.circle.com");
	}

	#[test]
	fn test_file_values_override_defaults() {
		let path = write_config(
			"usdc-router-config-test",
			r#"
[timeouts]
route_ms = 10000

[providers.lifi]
base_url = "https://staging.li.quest/v1"
integrator = "usdc-router"
api_key = { type = "env", value = "LIFI_API_KEY" }

[chains.8453]
name = "Base"
rpc_url = "https://mainnet.base.org"

[logging]
level = "debug"
format = "json"
structured = true
"#,
		);
		let stem = path.with_extension("");
		let settings = load_config_from(stem.to_str().unwrap()).unwrap();
		std::fs::remove_file(&path).ok();

		assert_eq!(settings.timeouts.route_ms, 10_000);
		// Unset fields keep their defaults
		assert_eq!(settings.timeouts.simulation_ms, 60_000);
		assert_eq!(settings.providers.lifi.integrator.as_deref(), Some("usdc-router"));
		assert_eq!(settings.rpc_urls().unwrap().len(), 1);
		assert_eq!(settings.logging.format, crate::settings::LogFormat::Json);
	}

	#[test]
	fn test_invalid_file_is_rejected() {
		let path = write_config(
			"usdc-router-config-invalid",
			r#"
[chains.base]
name = "Base"
rpc_url = "https://mainnet.base.org"
"#,
		);
		let stem = path.with_extension("");
		let result = load_config_from(stem.to_str().unwrap());
		std::fs::remove_file(&path).ok();

		assert!(matches!(
			result,
			Err(ConfigLoadError::Validation(ConfigValidationError::InvalidChainId(_)))
		));
	}
}
