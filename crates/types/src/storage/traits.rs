//! Storage traits for pluggable session persistence

use crate::sessions::{Session, SessionStatus};
use async_trait::async_trait;
use thiserror::Error;

/// Storage error type
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
	#[error("Item not found: {id}")]
	NotFound { id: String },
	#[error("Item already exists: {id}")]
	AlreadyExists { id: String },
	#[error("Serialization error: {message}")]
	Serialization { message: String },
	#[error("Storage operation failed: {message}")]
	Operation { message: String },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for session storage operations
#[async_trait]
pub trait SessionStorage: Send + Sync {
	/// Add a new session; fails if the id is taken
	async fn create_session(&self, session: Session) -> StorageResult<()>;

	/// Get a session by ID
	async fn get_session(&self, session_id: &str) -> StorageResult<Option<Session>>;

	/// Replace an existing session
	async fn update_session(&self, session: Session) -> StorageResult<()>;

	/// Remove a session by ID
	async fn delete_session(&self, session_id: &str) -> StorageResult<bool>;

	/// All sessions, newest first, optionally filtered by status
	async fn list_sessions(&self, status: Option<SessionStatus>) -> StorageResult<Vec<Session>>;

	/// Get session count
	async fn session_count(&self) -> StorageResult<usize>;
}
