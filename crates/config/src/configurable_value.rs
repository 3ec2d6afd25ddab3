//! Secrets that are either read from an environment variable or given inline

use serde::{Deserialize, Serialize};
use std::fmt;
use usdc_types::SecretString;

/// Inline values starting with this marker are placeholders shipped in sample configs
pub const INSECURE_DEFAULT_PREFIX: &str = "WARNING-INSECURE-DEFAULT";

/// `{ "type": "env" | "plain", "value": ... }`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConfigurableValue {
	#[serde(rename = "type")]
	pub value_type: ValueType,
	/// Variable name for `env`, the secret itself for `plain`
	pub value: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
	Env,
	Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurableValueError {
	#[error("Environment variable '{0}' not found")]
	EnvironmentVariableNotFound(String),

	#[error("Value from {0} is empty")]
	Empty(String),
}

impl ConfigurableValue {
	pub fn from_env(name: &str) -> Self {
		Self {
			value_type: ValueType::Env,
			value: name.to_string(),
		}
	}

	pub fn from_plain(value: &str) -> Self {
		Self {
			value_type: ValueType::Plain,
			value: value.to_string(),
		}
	}

	/// Resolve into a zeroizing secret; empty values are rejected
	pub fn resolve(&self) -> Result<SecretString, ConfigurableValueError> {
		let raw = match self.value_type {
			ValueType::Env => std::env::var(&self.value).map_err(|_| {
				ConfigurableValueError::EnvironmentVariableNotFound(self.value.clone())
			})?,
			ValueType::Plain => self.value.clone(),
		};
		if raw.trim().is_empty() {
			return Err(ConfigurableValueError::Empty(self.description()));
		}
		Ok(SecretString::new(raw))
	}

	pub fn is_insecure_default(&self) -> bool {
		self.value_type == ValueType::Plain && self.value.starts_with(INSECURE_DEFAULT_PREFIX)
	}

	/// Where the value comes from, safe to log
	pub fn description(&self) -> String {
		match self.value_type {
			ValueType::Env => format!("environment variable '{}'", self.value),
			ValueType::Plain if self.is_insecure_default() => "insecure default value".to_string(),
			ValueType::Plain => "configured plain value".to_string(),
		}
	}
}

// Never prints an inline secret
impl fmt::Display for ConfigurableValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.value_type {
			ValueType::Env => write!(f, "env:{}", self.value),
			ValueType::Plain if self.is_insecure_default() => write!(f, "plain:[INSECURE-DEFAULT]"),
			ValueType::Plain => write!(f, "plain:[REDACTED]"),
		}
	}
}

/// `"env:NAME"` reads `NAME`, anything else is a plain value
impl From<&str> for ConfigurableValue {
	fn from(value: &str) -> Self {
		match value.strip_prefix("env:") {
			Some(name) => Self::from_env(name),
			None => Self::from_plain(value),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_plain_and_env_resolution() {
		let plain = ConfigurableValue::from_plain("lifi-key");
		assert_eq!(plain.resolve().unwrap().expose_secret(), "lifi-key");

		std::env::set_var("USDC_ROUTER_TEST_ZEROEX_KEY", "zeroex-key");
		let env = ConfigurableValue::from("env:USDC_ROUTER_TEST_ZEROEX_KEY");
		assert_eq!(env.value_type, ValueType::Env);
		assert_eq!(env.resolve().unwrap().expose_secret(), "zeroex-key");
		std::env::remove_var("USDC_ROUTER_TEST_ZEROEX_KEY");

		assert_eq!(
			ConfigurableValue::from_env("USDC_ROUTER_TEST_MISSING").resolve(),
			Err(ConfigurableValueError::EnvironmentVariableNotFound(
				"USDC_ROUTER_TEST_MISSING".to_string()
			))
		);
		assert!(matches!(
			ConfigurableValue::from_plain("  ").resolve(),
			Err(ConfigurableValueError::Empty(_))
		));
	}

	#[test]
	fn test_display_redacts() {
		assert_eq!(ConfigurableValue::from_plain("secret").to_string(), "plain:[REDACTED]");
		let placeholder = ConfigurableValue::from_plain("WARNING-INSECURE-DEFAULT-key");
		assert!(placeholder.is_insecure_default());
		assert_eq!(placeholder.to_string(), "plain:[INSECURE-DEFAULT]");
		assert_eq!(placeholder.description(), "insecure default value");
		assert_eq!(ConfigurableValue::from_env("KEY").to_string(), "env:KEY");
	}

	#[test]
	fn test_serde_shape() {
		let value: ConfigurableValue =
			serde_json::from_str(r#"{"type": "env", "value": "LIFI_API_KEY"}"#).unwrap();
		assert_eq!(value, ConfigurableValue::from_env("LIFI_API_KEY"));
		let json = serde_json::to_value(ConfigurableValue::from_plain("x")).unwrap();
		assert_eq!(json["type"], "plain");
	}
}
