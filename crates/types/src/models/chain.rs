//! Chain identifiers and Circle domain mapping

use serde::{Deserialize, Serialize};

/// Chain the router knows how to reach
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Chain {
	pub chain_id: u64,
	pub name: String,
	pub is_testnet: bool,
}

/// (chain id, CCTP/Gateway domain, name, testnet)
const CIRCLE_DOMAINS: &[(u64, u32, &str, bool)] = &[
	(1, 0, "Ethereum", false),
	(43114, 1, "Avalanche", false),
	(10, 2, "OP Mainnet", false),
	(42161, 3, "Arbitrum", false),
	(8453, 6, "Base", false),
	(137, 7, "Polygon PoS", false),
	(130, 10, "Unichain", false),
	(59144, 11, "Linea", false),
	(146, 13, "Sonic", false),
	(480, 14, "World Chain", false),
	(11155111, 0, "Ethereum Sepolia", true),
	(43113, 1, "Avalanche Fuji", true),
	(11155420, 2, "OP Sepolia", true),
	(421614, 3, "Arbitrum Sepolia", true),
	(84532, 6, "Base Sepolia", true),
	(80002, 7, "Polygon Amoy", true),
];

/// Circle domain id for an EVM chain id
pub fn circle_domain(chain_id: u64) -> Option<u32> {
	CIRCLE_DOMAINS
		.iter()
		.find(|(id, ..)| *id == chain_id)
		.map(|(_, domain, ..)| *domain)
}

/// EVM chain id for a Circle domain on mainnet or testnet
pub fn chain_for_domain(domain: u32, testnet: bool) -> Option<u64> {
	CIRCLE_DOMAINS
		.iter()
		.find(|(_, d, _, t)| *d == domain && *t == testnet)
		.map(|(id, ..)| *id)
}

impl Chain {
	pub fn from_chain_id(chain_id: u64) -> Option<Self> {
		CIRCLE_DOMAINS
			.iter()
			.find(|(id, ..)| *id == chain_id)
			.map(|(id, _, name, testnet)| Self {
				chain_id: *id,
				name: name.to_string(),
				is_testnet: *testnet,
			})
	}
}

/// Parse a hex (`0x2105`) or decimal quantity, such as an `eth_chainId` result or a gas limit
pub fn parse_chain_id(value: &str) -> Option<u64> {
	let value = value.trim();
	match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
		Some(hex) => u64::from_str_radix(hex, 16).ok(),
		None => value.parse().ok(),
	}
}
