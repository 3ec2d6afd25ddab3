//! In-memory session storage using DashMap

use crate::traits::{SessionStorage, StorageError, StorageResult};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;
use usdc_types::{Session, SessionStatus};

/// In-memory storage for sessions
#[derive(Clone, Default)]
pub struct MemoryStore {
	pub sessions: Arc<DashMap<String, Session>>,
}

impl MemoryStore {
	/// Create a new memory store instance
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl SessionStorage for MemoryStore {
	async fn create_session(&self, session: Session) -> StorageResult<()> {
		match self.sessions.entry(session.id.clone()) {
			Entry::Occupied(_) => Err(StorageError::AlreadyExists { id: session.id }),
			Entry::Vacant(slot) => {
				debug!("Stored session {}", session.id);
				slot.insert(session);
				Ok(())
			},
		}
	}

	async fn get_session(&self, session_id: &str) -> StorageResult<Option<Session>> {
		Ok(self.sessions.get(session_id).map(|s| s.clone()))
	}

	async fn update_session(&self, session: Session) -> StorageResult<()> {
		match self.sessions.get_mut(&session.id) {
			Some(mut existing) => {
				*existing = session;
				Ok(())
			},
			None => Err(StorageError::NotFound { id: session.id }),
		}
	}

	async fn delete_session(&self, session_id: &str) -> StorageResult<bool> {
		Ok(self.sessions.remove(session_id).is_some())
	}

	async fn list_sessions(&self, status: Option<SessionStatus>) -> StorageResult<Vec<Session>> {
		let mut sessions: Vec<Session> = self
			.sessions
			.iter()
			.filter(|entry| status.map_or(true, |s| entry.status == s))
			.map(|entry| entry.value().clone())
			.collect();
		sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(sessions)
	}

	async fn session_count(&self) -> StorageResult<usize> {
		Ok(self.sessions.len())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use usdc_types::SessionParams;

	fn session() -> Session {
		Session::new(None, vec![], SessionParams::default())
	}

	#[tokio::test]
	async fn test_session_crud() {
		let store = MemoryStore::new();
		let mut s = session();
		store.create_session(s.clone()).await.unwrap();
		assert!(matches!(
			store.create_session(s.clone()).await,
			Err(StorageError::AlreadyExists { .. })
		));

		s.name = Some("renamed".to_string());
		store.update_session(s.clone()).await.unwrap();
		let loaded = store.get_session(&s.id).await.unwrap().unwrap();
		assert_eq!(loaded.name.as_deref(), Some("renamed"));

		assert_eq!(store.session_count().await.unwrap(), 1);
		assert!(store.delete_session(&s.id).await.unwrap());
		assert!(!store.delete_session(&s.id).await.unwrap());
		assert!(store.get_session(&s.id).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_update_missing_session_fails() {
		let store = MemoryStore::new();
		assert!(matches!(
			store.update_session(session()).await,
			Err(StorageError::NotFound { .. })
		));
	}

	#[tokio::test]
	async fn test_list_filters_by_status() {
		let store = MemoryStore::new();
		let draft = session();
		let mut submitted = session();
		submitted.advance(SessionStatus::Submitted).unwrap();
		store.create_session(draft).await.unwrap();
		store.create_session(submitted).await.unwrap();

		assert_eq!(store.list_sessions(None).await.unwrap().len(), 2);
		let drafts = store.list_sessions(Some(SessionStatus::Draft)).await.unwrap();
		assert_eq!(drafts.len(), 1);
		assert!(drafts[0].is_draft());
	}
}
