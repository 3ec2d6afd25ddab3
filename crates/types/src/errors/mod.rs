//! Classified, user-facing error taxonomy
//!
//! Provider, wallet and RPC failures only carry free text, so every failure that
//! reaches a user is mapped once through [`classify`] into a [`BridgeError`]
//! with a stable [`ErrorKind`], display copy and a retry policy.

pub mod classifier;

pub use classifier::{
	classify, classify_dyn, classify_message, retry_delay_ms, ClassificationRule,
	CLASSIFICATION_TABLE, MAX_RETRY_DELAY_MS, RATE_LIMIT_DELAY_MS,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Closed set of error kinds surfaced to users
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	UserRejected,
	InsufficientFunds,
	InsufficientGas,
	NoRoutes,
	QuoteExpired,
	SlippageExceeded,
	RateLimited,
	Network,
	RpcError,
	ChainNotSupported,
	WrongChain,
	ExecutionReverted,
	AmountTooLow,
	AmountTooHigh,
	ApprovalFailed,
	WalletDisconnected,
	Unknown,
}

impl ErrorKind {
	pub fn title(&self) -> &'static str {
		match self {
			ErrorKind::UserRejected => "Request rejected",
			ErrorKind::InsufficientFunds => "Insufficient funds",
			ErrorKind::InsufficientGas => "Not enough gas",
			ErrorKind::NoRoutes => "No routes found",
			ErrorKind::QuoteExpired => "Quote expired",
			ErrorKind::SlippageExceeded => "Price moved",
			ErrorKind::RateLimited => "Too many requests",
			ErrorKind::Network => "Network error",
			ErrorKind::RpcError => "RPC error",
			ErrorKind::ChainNotSupported => "Chain not supported",
			ErrorKind::WrongChain => "Wrong network",
			ErrorKind::ExecutionReverted => "Transaction reverted",
			ErrorKind::AmountTooLow => "Amount too low",
			ErrorKind::AmountTooHigh => "Amount too high",
			ErrorKind::ApprovalFailed => "Approval failed",
			ErrorKind::WalletDisconnected => "Wallet disconnected",
			ErrorKind::Unknown => "Something went wrong",
		}
	}

	pub fn message(&self) -> &'static str {
		match self {
			ErrorKind::UserRejected => "The request was rejected in your wallet.",
			ErrorKind::InsufficientFunds => {
				"Your balance is too low to cover this amount plus fees."
			},
			ErrorKind::InsufficientGas => {
				"There is not enough native token to pay for gas on this chain."
			},
			ErrorKind::NoRoutes => "No provider offered a route for this transfer.",
			ErrorKind::QuoteExpired => "The quote is no longer valid.",
			ErrorKind::SlippageExceeded => {
				"The price moved beyond your slippage tolerance."
			},
			ErrorKind::RateLimited => "A provider is limiting requests right now.",
			ErrorKind::Network => "A provider could not be reached.",
			ErrorKind::RpcError => "The chain RPC endpoint returned an error.",
			ErrorKind::ChainNotSupported => "This chain is not supported for this transfer.",
			ErrorKind::WrongChain => "Your wallet is connected to a different network.",
			ErrorKind::ExecutionReverted => "The transaction would fail on-chain.",
			ErrorKind::AmountTooLow => "The amount is below the minimum for this route.",
			ErrorKind::AmountTooHigh => "The amount is above the maximum for this route.",
			ErrorKind::ApprovalFailed => "The token approval did not go through.",
			ErrorKind::WalletDisconnected => "No wallet account is connected.",
			ErrorKind::Unknown => "An unexpected error occurred. Please try again.",
		}
	}

	pub fn suggestion(&self) -> Option<&'static str> {
		let suggestion = match self {
			ErrorKind::UserRejected => "Approve the request in your wallet to continue.",
			ErrorKind::InsufficientFunds => "Lower the amount or add funds.",
			ErrorKind::InsufficientGas => "Add native token for gas and retry.",
			ErrorKind::NoRoutes => "Try a different amount or destination chain.",
			ErrorKind::QuoteExpired => "Refresh the quote and try again.",
			ErrorKind::SlippageExceeded => "Increase slippage tolerance or retry.",
			ErrorKind::RateLimited => "Wait a moment before retrying.",
			ErrorKind::Network => "Check your connection and retry.",
			ErrorKind::RpcError => "Retry shortly or switch RPC endpoint.",
			ErrorKind::ChainNotSupported => "Pick one of the supported chains.",
			ErrorKind::WrongChain => "Switch your wallet to the source chain.",
			ErrorKind::ExecutionReverted => "Review the inputs and simulate again.",
			ErrorKind::AmountTooLow => "Increase the amount.",
			ErrorKind::AmountTooHigh => "Reduce the amount or split the transfer.",
			ErrorKind::ApprovalFailed => "Retry the approval from your wallet.",
			ErrorKind::WalletDisconnected => "Reconnect your wallet.",
			ErrorKind::Unknown => return None,
		};
		Some(suggestion)
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

/// A failure mapped onto [`ErrorKind`] with display copy and retry policy
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[error("{title}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct BridgeError {
	pub code: ErrorKind,
	pub title: String,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub suggestion: Option<String>,
	pub retryable: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub retry_delay_ms: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub original_error: Option<String>,
}

impl BridgeError {
	/// Build an error of the given kind using the table's retry policy
	pub fn new(code: ErrorKind) -> Self {
		let (retryable, retry_delay_ms) = CLASSIFICATION_TABLE
			.iter()
			.find(|rule| rule.kind == code)
			.map(|rule| (rule.retryable, rule.retry_delay_ms))
			.unwrap_or((false, None));

		Self {
			code,
			title: code.title().to_string(),
			message: code.message().to_string(),
			suggestion: code.suggestion().map(str::to_string),
			retryable,
			retry_delay_ms,
			original_error: None,
		}
	}

	pub fn with_title(mut self, title: impl Into<String>) -> Self {
		self.title = title.into();
		self
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = message.into();
		self
	}

	pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
		self.suggestion = Some(suggestion.into());
		self
	}

	pub fn with_original(mut self, original: impl Into<String>) -> Self {
		self.original_error = Some(original.into());
		self
	}

	pub fn is_user_rejection(&self) -> bool {
		self.code == ErrorKind::UserRejected
	}
}
