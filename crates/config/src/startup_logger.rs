//! Service startup logging for the USDC router

use crate::Settings;
use std::env;
use tracing::{info, warn};

/// Logs service information at startup
pub fn log_service_info() {
	let service_name = "usdc-router";
	let service_version = env!("CARGO_PKG_VERSION");

	info!("=== USDC Router Starting ===");
	info!("🚀 Service: {} v{}", service_name, service_version);
	info!("💻 Platform: {} ({})", env::consts::OS, env::consts::ARCH);

	if let Ok(cwd) = env::current_dir() {
		info!("📁 Working Directory: {}", cwd.display());
	}

	if let Ok(rust_log) = env::var("RUST_LOG") {
		info!("🔧 Log Level: {}", rust_log);
	}

	if let Ok(config_path) = env::var("CONFIG_PATH") {
		info!("📋 Config Path: {}", config_path);
	}

	info!(
		"🕒 Started at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

/// Summary of what the router was built with; never logs secret values
pub fn log_settings_summary(settings: &Settings) {
	info!(
		"⏱️ Timeouts: route {}ms, provider {}ms, simulation {}ms",
		settings.timeouts.route_ms, settings.timeouts.provider_ms, settings.timeouts.simulation_ms
	);
	let mut chains: Vec<&String> = settings.chains.keys().collect();
	chains.sort();
	info!("⛓️ Simulation chains: {:?}", chains);
	if let Some(key) = &settings.providers.lifi.api_key {
		info!("🔑 LI.FI key from {}", key.description());
	}
	for name in settings.insecure_secrets() {
		warn!("⚠️ {} still uses an insecure default value", name);
	}
}

/// Logs service shutdown information
pub fn log_service_shutdown() {
	info!("🛑 USDC Router Shutting Down");
	info!(
		"🕒 Shutdown at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

pub fn log_startup_complete(providers: &[&str]) {
	info!("✅ USDC Router ready");
	info!("📡 Route providers: {}", providers.join(", "));
}
