//! Ordered substring table mapping free-text failures to [`ErrorKind`]

use super::{BridgeError, ErrorKind};
use std::error::Error as StdError;

/// Fixed delay for rate-limited providers
pub const RATE_LIMIT_DELAY_MS: u64 = 30_000;
/// Backoff base for other retryable kinds
pub const BASE_RETRY_DELAY_MS: u64 = 1_000;
pub const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// One row of the classification table
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
	pub kind: ErrorKind,
	/// Lower-case substrings; any match selects this rule
	pub patterns: &'static [&'static str],
	pub retryable: bool,
	pub retry_delay_ms: Option<u64>,
}

const fn rule(
	kind: ErrorKind,
	patterns: &'static [&'static str],
	retryable: bool,
	retry_delay_ms: Option<u64>,
) -> ClassificationRule {
	ClassificationRule {
		kind,
		patterns,
		retryable,
		retry_delay_ms,
	}
}

/// Evaluated top to bottom; the first matching rule wins.
pub const CLASSIFICATION_TABLE: &[ClassificationRule] = &[
	rule(
		ErrorKind::UserRejected,
		&[
			"user rejected",
			"user denied",
			"rejected by user",
			"user cancelled",
			"user canceled",
			"action_rejected",
			"request rejected",
			"wallet request failed (4001)",
		],
		false,
		None,
	),
	rule(
		ErrorKind::InsufficientFunds,
		&["insufficient funds", "insufficient balance", "exceeds balance"],
		false,
		None,
	),
	rule(
		ErrorKind::InsufficientGas,
		&[
			"insufficient gas",
			"out of gas",
			"gas required exceeds",
			"intrinsic gas too low",
		],
		false,
		None,
	),
	rule(
		ErrorKind::NoRoutes,
		&["no routes", "no route", "no available quotes", "no quote"],
		false,
		None,
	),
	rule(
		ErrorKind::QuoteExpired,
		&[
			"quote expired",
			"quote has expired",
			"expired quote",
			"stale quote",
			"quote is no longer valid",
		],
		true,
		None,
	),
	rule(
		ErrorKind::SlippageExceeded,
		&[
			"slippage",
			"price impact",
			"too little received",
			"insufficient output amount",
			"insufficient_output_amount",
		],
		false,
		None,
	),
	rule(
		ErrorKind::RateLimited,
		&[
			"too many requests",
			"rate limit",
			"rate-limit",
			"ratelimit",
			"status 429",
			"http 429",
		],
		true,
		Some(RATE_LIMIT_DELAY_MS),
	),
	rule(
		ErrorKind::Network,
		&[
			"network error",
			"failed to fetch",
			"fetch failed",
			"timeout",
			"timed out",
			"connection refused",
			"connection reset",
			"econnrefused",
			"enotfound",
			"dns error",
			"error sending request",
		],
		true,
		None,
	),
	rule(
		ErrorKind::RpcError,
		&[
			"internal json-rpc error",
			"json-rpc",
			"rpc error",
			"-32603",
			"-32000",
			"header not found",
			"missing trie node",
		],
		true,
		None,
	),
	rule(
		ErrorKind::ChainNotSupported,
		&[
			"chain not supported",
			"unsupported chain",
			"chain is not supported",
			"unsupported network",
			"network not supported",
		],
		false,
		None,
	),
	rule(
		ErrorKind::WrongChain,
		&[
			"wrong chain",
			"wrong network",
			"chain mismatch",
			"does not match the target chain",
		],
		false,
		None,
	),
	rule(
		ErrorKind::ExecutionReverted,
		&["execution reverted", "transaction reverted", "reverted", "revert"],
		false,
		None,
	),
	rule(
		ErrorKind::AmountTooLow,
		&[
			"amount too low",
			"amount is too low",
			"below minimum",
			"less than minimum",
		],
		false,
		None,
	),
	rule(
		ErrorKind::AmountTooHigh,
		&[
			"amount too high",
			"amount is too high",
			"exceeds maximum",
			"above maximum",
			"greater than maximum",
		],
		false,
		None,
	),
	rule(
		ErrorKind::ApprovalFailed,
		&[
			"approval failed",
			"approve failed",
			"insufficient allowance",
			"allowance",
		],
		false,
		None,
	),
	rule(
		ErrorKind::WalletDisconnected,
		&[
			"disconnected",
			"not connected",
			"no accounts",
			"wallet request failed (4900)",
			"wallet request failed (4901)",
		],
		false,
		None,
	),
];

/// Classify a raw message; no match yields [`ErrorKind::Unknown`]
pub fn classify_message(message: &str) -> BridgeError {
	let lowered = message.to_lowercase();
	let kind = CLASSIFICATION_TABLE
		.iter()
		.find(|rule| rule.patterns.iter().any(|p| lowered.contains(p)))
		.map(|rule| rule.kind)
		.unwrap_or(ErrorKind::Unknown);

	BridgeError::new(kind).with_original(message)
}

/// Classify an error, including its `source()` chain in the matched text.
///
/// An error that is already a [`BridgeError`] is returned unchanged.
pub fn classify_dyn(err: &(dyn StdError + 'static)) -> BridgeError {
	if let Some(classified) = err.downcast_ref::<BridgeError>() {
		return classified.clone();
	}

	let mut message = err.to_string();
	let mut source = err.source();
	while let Some(cause) = source {
		let cause_text = cause.to_string();
		if !message.contains(&cause_text) {
			message.push_str(": ");
			message.push_str(&cause_text);
		}
		source = cause.source();
	}
	classify_message(&message)
}

pub fn classify<E: StdError + 'static>(err: &E) -> BridgeError {
	classify_dyn(err)
}

/// Delay before retry `attempt` (0-based).
///
/// An explicit `retry_delay_ms` wins; otherwise 1s doubling per attempt, capped at 30s.
pub fn retry_delay_ms(err: &BridgeError, attempt: u32) -> u64 {
	if let Some(delay) = err.retry_delay_ms {
		return delay;
	}
	BASE_RETRY_DELAY_MS
		.saturating_mul(2u64.saturating_pow(attempt))
		.min(MAX_RETRY_DELAY_MS)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_documented_patterns() {
		let cases = [
			("MetaMask Tx Signature: User denied transaction signature.", ErrorKind::UserRejected),
			("ACTION_REJECTED", ErrorKind::UserRejected),
			("insufficient funds for gas * price + value", ErrorKind::InsufficientFunds),
			("ERC20: transfer amount exceeds balance", ErrorKind::InsufficientFunds),
			("out of gas", ErrorKind::InsufficientGas),
			("gas required exceeds allowance (30000000)", ErrorKind::InsufficientGas),
			("No routes found for this pair", ErrorKind::NoRoutes),
			("No available quotes for the requested transfer", ErrorKind::NoRoutes),
			("Quote expired, please refresh", ErrorKind::QuoteExpired),
			("Slippage exceeded", ErrorKind::SlippageExceeded),
			("UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT", ErrorKind::SlippageExceeded),
			("429 Too Many Requests", ErrorKind::RateLimited),
			("Rate limit exceeded", ErrorKind::RateLimited),
			("TypeError: Failed to fetch", ErrorKind::Network),
			("Route request timed out after 45000ms", ErrorKind::Network),
			("Internal JSON-RPC error.", ErrorKind::RpcError),
			("header not found", ErrorKind::RpcError),
			("Chain not supported", ErrorKind::ChainNotSupported),
			("Wrong network selected", ErrorKind::WrongChain),
			("execution reverted: custom error 0x1234", ErrorKind::ExecutionReverted),
			("Amount too low for bridge", ErrorKind::AmountTooLow),
			("Amount exceeds maximum transfer", ErrorKind::AmountTooHigh),
			("Approval failed", ErrorKind::ApprovalFailed),
			("Wallet disconnected", ErrorKind::WalletDisconnected),
		];

		for (message, expected) in cases {
			assert_eq!(classify_message(message).code, expected, "message: {}", message);
		}
	}

	#[test]
	fn test_first_match_wins() {
		// Mentions both a revert and slippage; slippage is earlier in the table
		let err = classify_message("execution reverted: slippage tolerance exceeded");
		assert_eq!(err.code, ErrorKind::SlippageExceeded);
	}

	#[test]
	fn test_bare_status_code_is_not_rate_limit() {
		assert_eq!(classify_message("order 4291 failed").code, ErrorKind::Unknown);
	}

	#[test]
	fn test_unknown_has_generic_copy() {
		let err = classify_message("kaboom: segfault in module xyz");
		assert_eq!(err.code, ErrorKind::Unknown);
		assert!(!err.retryable);
		assert!(!err.message.contains("kaboom"));
		assert_eq!(err.original_error.as_deref(), Some("kaboom: segfault in module xyz"));
	}

	#[test]
	fn test_rate_limit_fixed_delay() {
		let err = classify_message("HTTP 429: too many requests");
		assert!(err.retryable);
		assert_eq!(err.retry_delay_ms, Some(RATE_LIMIT_DELAY_MS));
		for attempt in 0..6 {
			assert_eq!(retry_delay_ms(&err, attempt), 30_000);
		}
	}

	#[test]
	fn test_exponential_backoff() {
		let err = classify_message("network error");
		assert!(err.retryable);
		assert_eq!(err.retry_delay_ms, None);
		let delays: Vec<u64> = (0..8).map(|attempt| retry_delay_ms(&err, attempt)).collect();
		assert_eq!(
			delays,
			vec![1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000, 30_000]
		);
		assert_eq!(retry_delay_ms(&err, 200), 30_000);
	}

	#[test]
	fn test_retryable_set() {
		for rule in CLASSIFICATION_TABLE {
			let expected = matches!(
				rule.kind,
				ErrorKind::QuoteExpired
					| ErrorKind::RateLimited
					| ErrorKind::Network
					| ErrorKind::RpcError
			);
			assert_eq!(rule.retryable, expected, "{:?}", rule.kind);
			assert_eq!(BridgeError::new(rule.kind).retryable, expected);
		}
	}

	#[test]
	fn test_classify_walks_source_chain_and_keeps_classified() {
		#[derive(Debug, thiserror::Error)]
		#[error("request to provider failed")]
		struct Outer(#[source] std::io::Error);

		let err = Outer(std::io::Error::new(
			std::io::ErrorKind::ConnectionRefused,
			"connection refused",
		));
		assert_eq!(classify(&err).code, ErrorKind::Network);

		let already = BridgeError::new(ErrorKind::NoRoutes);
		assert_eq!(classify(&already), already);
	}
}
