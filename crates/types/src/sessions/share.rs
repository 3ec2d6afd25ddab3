//! Compact share links for sessions
//!
//! Format: `1.` followed by base64url (no padding) of the deflated JSON
//! `{v, name, actions, params}`. Amounts are JSON strings, so big values survive.

use super::{Session, SessionParams};
use crate::actions::{create_action, Action, ActionType};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use thiserror::Error;
use tracing::warn;

pub const SHARE_LINK_VERSION: u8 = 1;

/// Decoded payloads larger than this are rejected
const MAX_DECODED_BYTES: u64 = 256 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareLinkError {
	#[error("share link is empty")]
	Empty,

	#[error("unsupported share link version: {0}")]
	UnsupportedVersion(String),

	#[error("share link is not valid base64: {0}")]
	Encoding(String),

	#[error("share link payload could not be inflated: {0}")]
	Compression(String),

	#[error("share link payload exceeds {MAX_DECODED_BYTES} bytes")]
	TooLarge,

	#[error("share link payload is not a valid session: {0}")]
	Payload(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SharePayload {
	pub v: u8,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	pub actions: Vec<Action>,
	#[serde(default)]
	pub params: SessionParams,
}

pub fn encode_share_link(session: &Session) -> Result<String, ShareLinkError> {
	let payload = SharePayload {
		v: SHARE_LINK_VERSION,
		name: session.name.clone(),
		actions: session.actions.clone(),
		params: session.params.clone(),
	};
	let json = serde_json::to_vec(&payload).map_err(|e| ShareLinkError::Payload(e.to_string()))?;

	let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
	encoder
		.write_all(&json)
		.map_err(|e| ShareLinkError::Compression(e.to_string()))?;
	let compressed = encoder
		.finish()
		.map_err(|e| ShareLinkError::Compression(e.to_string()))?;

	Ok(format!(
		"{}.{}",
		SHARE_LINK_VERSION,
		URL_SAFE_NO_PAD.encode(compressed)
	))
}

/// Accepts the bare token, a `#fragment`, or a `?s=token&...` query string
pub fn decode_share_link(link: &str) -> Result<SharePayload, ShareLinkError> {
	let token = extract_token(link);
	if token.is_empty() {
		return Err(ShareLinkError::Empty);
	}

	let (version, body) = token
		.split_once('.')
		.ok_or_else(|| ShareLinkError::UnsupportedVersion(token.chars().take(8).collect()))?;
	if version != SHARE_LINK_VERSION.to_string() {
		return Err(ShareLinkError::UnsupportedVersion(version.to_string()));
	}

	let compressed = URL_SAFE_NO_PAD
		.decode(body)
		.map_err(|e| ShareLinkError::Encoding(e.to_string()))?;

	let mut json = Vec::new();
	DeflateDecoder::new(compressed.as_slice())
		.take(MAX_DECODED_BYTES + 1)
		.read_to_end(&mut json)
		.map_err(|e| ShareLinkError::Compression(e.to_string()))?;
	if json.len() as u64 > MAX_DECODED_BYTES {
		return Err(ShareLinkError::TooLarge);
	}

	let payload: SharePayload =
		serde_json::from_slice(&json).map_err(|e| ShareLinkError::Payload(e.to_string()))?;
	if payload.v != SHARE_LINK_VERSION {
		return Err(ShareLinkError::UnsupportedVersion(payload.v.to_string()));
	}
	Ok(payload)
}

fn extract_token(link: &str) -> &str {
	let link = link.trim();
	let link = link
		.rsplit_once('#')
		.map(|(_, fragment)| fragment)
		.unwrap_or(link);
	let link = link
		.split_once('?')
		.map(|(_, query)| query)
		.unwrap_or(link);

	if let Some(value) = link
		.split('&')
		.find_map(|pair| pair.strip_prefix("s="))
	{
		return value;
	}
	link
}

/// Open a shared session without persisting it.
///
/// Malformed links degrade to a draft with a single default bridge action.
pub fn session_from_share_link(link: &str) -> Session {
	match decode_share_link(link) {
		Ok(payload) => Session::new(payload.name, payload.actions, payload.params),
		Err(e) => {
			warn!("Falling back to default session, share link rejected: {}", e);
			fallback_session()
		},
	}
}

fn fallback_session() -> Session {
	let actions = create_action(ActionType::Bridge, None)
		.map(|action| vec![action])
		.unwrap_or_default();
	Session::new(None, actions, SessionParams::default())
}
