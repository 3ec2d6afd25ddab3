//! USDC Router Configuration
//!
//! Settings, loading and startup logging for the USDC router.

pub mod configurable_value;
pub mod loader;
pub mod settings;
pub mod startup_logger;

pub use configurable_value::{ConfigurableValue, ConfigurableValueError, ValueType};
pub use loader::{load_config, load_config_from, ConfigLoadError};
pub use settings::{ConfigValidationError, LogFormat, LoggingSettings, Settings};
pub use startup_logger::{
	log_service_info, log_service_shutdown, log_settings_summary, log_startup_complete,
};
