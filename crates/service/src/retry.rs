//! Caller-side retry for classified failures
//!
//! Only kinds the classifier marks retryable are retried. Wallet requests must
//! never go through here: a user rejection is final.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use usdc_types::{retry_delay_ms, BridgeError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Total attempts including the first
	pub max_attempts: u32,
	/// Upper bound applied on top of the classifier's delay
	pub max_delay_ms: Option<u64>,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: DEFAULT_MAX_ATTEMPTS,
			max_delay_ms: None,
		}
	}
}

impl RetryPolicy {
	pub fn new(max_attempts: u32) -> Self {
		Self {
			max_attempts: max_attempts.max(1),
			max_delay_ms: None,
		}
	}

	pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
		self.max_delay_ms = Some(max_delay_ms);
		self
	}

	/// Delay before the retry following failed `attempt` (0-based)
	pub fn delay_for(&self, err: &BridgeError, attempt: u32) -> Duration {
		let delay = retry_delay_ms(err, attempt);
		let delay = self.max_delay_ms.map_or(delay, |cap| delay.min(cap));
		Duration::from_millis(delay)
	}
}

/// Run `op` until it succeeds, fails with a non-retryable kind, or attempts run out.
///
/// `op` receives the 0-based attempt number.
pub async fn retry_classified<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, BridgeError>
where
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = Result<T, BridgeError>>,
{
	let mut attempt = 0;
	loop {
		match op(attempt).await {
			Ok(value) => return Ok(value),
			Err(err) if err.retryable && attempt + 1 < policy.max_attempts => {
				let delay = policy.delay_for(&err, attempt);
				warn!(
					"Attempt {} failed with {:?}, retrying in {}ms",
					attempt + 1,
					err.code,
					delay.as_millis()
				);
				tokio::time::sleep(delay).await;
				attempt += 1;
			},
			Err(err) => {
				debug!("Giving up after {} attempts: {}", attempt + 1, err);
				return Err(err);
			},
		}
	}
}
