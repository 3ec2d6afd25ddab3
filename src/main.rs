//! USDC Router CLI
//!
//! Operator entry point: resolve routes, inspect CCTP fees, decode share links
//! and look up function selectors.

use alloy_primitives::{Address, I256};
use clap::{Parser, Subcommand};
use usdc_router::config::{load_config, log_service_shutdown, log_settings_summary};
use usdc_router::{init_tracing, log_service_info, Amount, RouteRequest, RouterBuilder};
use usdc_types::models::parse_chain_id;
use usdc_types::sessions::decode_share_link;

#[derive(Debug, Parser)]
#[command(name = "usdc-router", version, about = "Multi-provider USDC routing")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Resolve and print routes for a transfer
	Routes {
		/// Source chain id (decimal or 0x-hex)
		#[arg(long)]
		from: String,
		/// Destination chain id (decimal or 0x-hex)
		#[arg(long)]
		to: String,
		/// Amount in human units, e.g. 25.5
		#[arg(long)]
		amount: String,
		#[arg(long, env = "USDC_ROUTER_FROM_ADDRESS")]
		from_address: Address,
		#[arg(long)]
		to_address: Option<Address>,
		#[arg(long, default_value = "USDC")]
		asset: String,
	},
	/// Print CCTP fee tiers between two chains
	Fees {
		#[arg(long)]
		from: String,
		#[arg(long)]
		to: String,
		/// Also compute the fee for this amount (human units)
		#[arg(long)]
		amount: Option<String>,
	},
	/// Decode a session share link
	DecodeLink { link: String },
	/// Look up a 4-byte selector or 32-byte event topic
	Selector { hex: String },
}

fn chain_arg(value: &str) -> Result<u64, String> {
	parse_chain_id(value).ok_or_else(|| format!("Invalid chain id '{}'", value))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	dotenvy::dotenv().ok();
	let cli = Cli::parse();

	let settings = load_config()?;
	init_tracing(&settings)?;
	log_service_info();
	log_settings_summary(&settings);

	let router = RouterBuilder::from_config(settings).build()?;

	match cli.command {
		Command::Routes {
			from,
			to,
			amount,
			from_address,
			to_address,
			asset,
		} => {
			let decimals = router
				.routes
				.asset(&asset)
				.map(|a| a.decimals)
				.ok_or_else(|| format!("Unknown asset '{}'", asset))?;
			let units = Amount::from_decimal_units(&amount, decimals)?;
			let mut request = RouteRequest::new(
				chain_arg(&from)?,
				chain_arg(&to)?,
				asset,
				I256::try_from(units.as_u256()).map_err(|_| "Amount too large")?,
				from_address,
			);
			if let Some(recipient) = to_address {
				request = request.with_recipient(recipient);
			}
			let providers: Vec<String> = router
				.registry
				.route_providers()
				.iter()
				.map(|p| p.id().to_string())
				.collect();
			let provider_ids: Vec<&str> = providers.iter().map(String::as_str).collect();
			usdc_router::log_startup_complete(&provider_ids);

			match router.resolve_routes(&request).await {
				Ok(route_set) => print_json(&route_set)?,
				Err(classified) => print_json(&classified)?,
			}
		},
		Command::Fees { from, to, amount } => {
			let fees = router
				.cctp
				.fetch_fees(chain_arg(&from)?, chain_arg(&to)?)
				.await?;
			print_json(&fees)?;
			if let Some(amount) = amount {
				let units = Amount::from_decimal_units(&amount, 6)?;
				for fee in &fees {
					if let Some(charged) = fee.fee_for(units) {
						println!(
							"threshold {}: fee {} USDC",
							fee.finality_threshold,
							charged.format_units(6)
						);
					}
				}
			}
		},
		Command::DecodeLink { link } => {
			print_json(&decode_share_link(&link)?)?;
		},
		Command::Selector { hex } => {
			let digits = hex.trim_start_matches("0x").len();
			let signatures = if digits == 64 {
				router.signatures.lookup_event(&hex).await?
			} else {
				router.signatures.lookup_function(&hex).await?
			};
			if signatures.is_empty() {
				println!("No signatures found for {}", hex);
			}
			for signature in signatures {
				println!("{}", signature);
			}
		},
	}

	log_service_shutdown();
	Ok(())
}
