//! Error types for provider adapter operations

use thiserror::Error;

/// Longest body snippet kept on a provider error
pub const MAX_BODY_SNIPPET: usize = 512;

/// Adapter operation errors
///
/// Adapters return these raw; classification into user-facing kinds happens in
/// the resolver and the session orchestrator.
#[derive(Error, Debug)]
pub enum AdapterError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("{provider} returned HTTP {status}: {body}")]
	Provider {
		provider: String,
		status: u16,
		body: String,
	},

	#[error("Invalid response from {provider}: {reason}")]
	InvalidResponse { provider: String, reason: String },

	#[error("Request to {provider} timed out after {timeout_ms}ms")]
	Timeout { provider: String, timeout_ms: u64 },

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("Configuration error: {reason}")]
	Config { reason: String },
}

impl AdapterError {
	/// Build a provider error, truncating the body at a char boundary
	pub fn provider(provider: impl Into<String>, status: u16, body: &str) -> Self {
		let mut end = body.len().min(MAX_BODY_SNIPPET);
		while !body.is_char_boundary(end) {
			end -= 1;
		}
		AdapterError::Provider {
			provider: provider.into(),
			status,
			body: body[..end].to_string(),
		}
	}

	pub fn invalid_response(provider: impl Into<String>, reason: impl Into<String>) -> Self {
		AdapterError::InvalidResponse {
			provider: provider.into(),
			reason: reason.into(),
		}
	}

	/// Extract HTTP status code from the error if available
	pub fn status_code(&self) -> Option<u16> {
		match self {
			AdapterError::Provider { status, .. } => Some(*status),
			AdapterError::Http(e) => e.status().map(|s| s.as_u16()),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_body_snippet_truncated_on_char_boundary() {
		let body = "é".repeat(400); // 800 bytes
		let AdapterError::Provider { body: snippet, .. } = AdapterError::provider("cctp", 500, &body)
		else {
			panic!("expected provider error");
		};
		assert!(snippet.len() <= MAX_BODY_SNIPPET);
		assert_eq!(snippet.len(), 512);
	}

	#[test]
	fn test_display_carries_status() {
		let err = AdapterError::provider("lifi", 429, "Too Many Requests");
		assert_eq!(err.to_string(), "lifi returned HTTP 429: Too Many Requests");
		assert_eq!(err.status_code(), Some(429));
	}
}
