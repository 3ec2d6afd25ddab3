//! Revert data decoding

use alloy_sol_types::{Panic, Revert, SolError};

/// Decoded view of raw revert bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevertInfo {
	/// `Error(string)` message or a panic description
	pub reason: Option<String>,
	/// Leading 4 bytes as `0x`-prefixed hex
	pub selector: Option<String>,
}

/// Decode `Error(string)` / `Panic(uint256)` revert data and extract the selector
pub fn decode_revert(data: &[u8]) -> RevertInfo {
	let selector = (data.len() >= 4).then(|| format!("0x{}", hex_lower(&data[..4])));

	let reason = if let Ok(revert) = Revert::abi_decode(data) {
		Some(revert.reason().to_string())
	} else if let Ok(panic) = Panic::abi_decode(data) {
		Some(format!("panic code 0x{:x}", panic.code))
	} else {
		None
	};

	RevertInfo { reason, selector }
}

fn hex_lower(bytes: &[u8]) -> String {
	bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
