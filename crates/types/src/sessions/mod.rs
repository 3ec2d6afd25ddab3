//! Sessions: ordered actions moving through Draft -> Submitted -> Finalized

pub mod errors;
pub mod share;

pub use errors::{SessionError, SessionResult};
pub use share::{
	decode_share_link, encode_share_link, session_from_share_link, ShareLinkError, SharePayload,
	SHARE_LINK_VERSION,
};

use crate::actions::Action;
use crate::errors::BridgeError;
use crate::models::Amount;
use crate::simulation::SimulationSummary;
use alloy_primitives::{Address, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Top-level lifecycle status; only ever moves forward
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
	Draft,
	Submitted,
	Finalized,
}

impl SessionStatus {
	pub fn next(&self) -> Option<SessionStatus> {
		match self {
			SessionStatus::Draft => Some(SessionStatus::Submitted),
			SessionStatus::Submitted => Some(SessionStatus::Finalized),
			SessionStatus::Finalized => None,
		}
	}

	pub fn can_transition_to(&self, next: SessionStatus) -> bool {
		self.next() == Some(next)
	}
}

impl fmt::Display for SessionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SessionStatus::Draft => write!(f, "draft"),
			SessionStatus::Submitted => write!(f, "submitted"),
			SessionStatus::Finalized => write!(f, "finalized"),
		}
	}
}

/// Session-wide parameters shared by all actions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionParams {
	/// Account that signs the session's transactions
	pub owner: Option<Address>,
	pub slippage_bps: Option<u32>,
	/// Unix seconds after which quotes should be considered expired
	pub deadline: Option<u64>,
	pub max_fee: Option<Amount>,
	pub note: Option<String>,
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
	pub submitted_at: DateTime<Utc>,
	/// Hash of the first broadcast transaction
	pub tx_hash: Option<B256>,
	pub chain_id: Option<u64>,
	#[serde(default)]
	pub tx_hashes: Vec<B256>,
	/// Set when the wallet stopped partway through a multi-transaction submit
	#[serde(default)]
	pub incomplete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
	pub transaction_hash: B256,
	pub block_number: u64,
	pub success: bool,
	#[serde(default)]
	pub gas_used: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Finalization {
	pub at: DateTime<Utc>,
	pub receipt: Option<TransactionReceipt>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	pub id: String,
	pub name: Option<String>,
	pub actions: Vec<Action>,
	pub status: SessionStatus,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub params: SessionParams,
	pub simulation: Option<SimulationSummary>,
	pub execution: Option<Execution>,
	pub finalization: Option<Finalization>,
	/// Most recent classified failure of simulate/submit
	pub last_error: Option<BridgeError>,
	/// False for sessions opened from a share link until committed
	#[serde(default)]
	pub persisted: bool,
}

impl Session {
	/// New draft with a fresh id; not yet persisted
	pub fn new(name: Option<String>, actions: Vec<Action>, params: SessionParams) -> Self {
		let now = Utc::now();
		Self {
			id: Uuid::new_v4().to_string(),
			name,
			actions,
			status: SessionStatus::Draft,
			created_at: now,
			updated_at: now,
			params,
			simulation: None,
			execution: None,
			finalization: None,
			last_error: None,
			persisted: false,
		}
	}

	/// SHA-256 over the canonical JSON of actions and params
	pub fn fingerprint(&self) -> String {
		fingerprint(&self.actions, &self.params)
	}

	/// True when the stored simulation was run against different actions/params
	pub fn simulation_is_stale(&self) -> bool {
		self.simulation
			.as_ref()
			.map(|s| s.params_hash != self.fingerprint())
			.unwrap_or(true)
	}

	/// Move to the next status; anything else is rejected
	pub fn advance(&mut self, next: SessionStatus) -> SessionResult<()> {
		if !self.status.can_transition_to(next) {
			return Err(SessionError::InvalidTransition {
				from: self.status,
				to: next,
			});
		}
		self.status = next;
		self.touch();
		Ok(())
	}

	pub fn is_draft(&self) -> bool {
		self.status == SessionStatus::Draft
	}

	pub fn touch(&mut self) {
		self.updated_at = Utc::now();
	}
}

pub fn fingerprint(actions: &[Action], params: &SessionParams) -> String {
	// serde_json::Map is ordered by key, so the encoding is canonical
	let canonical = serde_json::json!({ "actions": actions, "params": params });
	let digest = Sha256::digest(canonical.to_string().as_bytes());
	digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::actions::{create_action, ActionType};
	use serde_json::json;

	fn draft() -> Session {
		let bridge = create_action(ActionType::Bridge, Some(json!({"amount": "5000000"}))).unwrap();
		Session::new(Some("test".to_string()), vec![bridge], SessionParams::default())
	}

	#[test]
	fn test_status_only_moves_forward() {
		let mut session = draft();
		assert!(session.advance(SessionStatus::Finalized).is_err());
		session.advance(SessionStatus::Submitted).unwrap();
		assert!(session.advance(SessionStatus::Draft).is_err());
		assert!(session.advance(SessionStatus::Submitted).is_err());
		session.advance(SessionStatus::Finalized).unwrap();
		assert!(matches!(
			session.advance(SessionStatus::Draft),
			Err(SessionError::InvalidTransition {
				from: SessionStatus::Finalized,
				to: SessionStatus::Draft
			})
		));
	}

	#[test]
	fn test_fingerprint_tracks_params() {
		let mut session = draft();
		let before = session.fingerprint();
		assert_eq!(before.len(), 64);
		assert_eq!(before, draft().fingerprint());

		session.params.slippage_bps = Some(75);
		assert_ne!(before, session.fingerprint());
	}

	#[test]
	fn test_no_simulation_is_stale() {
		assert!(draft().simulation_is_stale());
	}
}
