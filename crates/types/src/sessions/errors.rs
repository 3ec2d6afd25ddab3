//! Session orchestration errors

use super::SessionStatus;
use crate::errors::BridgeError;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SessionError {
	#[error("session not found: {0}")]
	NotFound(String),

	#[error("cannot move session from {from} to {to}")]
	InvalidTransition {
		from: SessionStatus,
		to: SessionStatus,
	},

	#[error("session {0} has not been simulated")]
	SimulationRequired(String),

	#[error("simulation for session {0} is out of date")]
	SimulationStale(String),

	#[error("simulation for session {session_id} did not succeed: {reason}")]
	SimulationFailed { session_id: String, reason: String },

	#[error("a submission for session {0} is already in progress")]
	SubmitInProgress(String),

	#[error("session {0} has no actions")]
	EmptySession(String),

	#[error(transparent)]
	Classified(#[from] BridgeError),

	#[error("storage error: {0}")]
	Storage(#[from] StorageError),

	#[error("failed to resolve action payload: {0}")]
	Resolve(String),
}

impl SessionError {
	/// Classified form, when the failure came from a provider, wallet or RPC
	pub fn classified(&self) -> Option<&BridgeError> {
		match self {
			SessionError::Classified(err) => Some(err),
			_ => None,
		}
	}
}

pub type SessionResult<T> = Result<T, SessionError>;
