//! Shared mocks for the integration suites
//!
//! Route providers with delays, failures and call counters, a scripted
//! EIP-1193 wallet, and an in-memory ERC-20 fork backend.

#![allow(dead_code)]

pub mod fork;
pub mod providers;
pub mod wallet;

#[allow(unused_imports)]
pub use fork::{
	approval_topic, approve_data, transfer_from_data, transfer_topic, Erc20ForkBackend,
	TOKEN_MESSENGER, USDC_MAINNET,
};
#[allow(unused_imports)]
pub use providers::MockRouteProvider;
#[allow(unused_imports)]
pub use wallet::MockWallet;
