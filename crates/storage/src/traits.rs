//! Storage traits for pluggable storage implementations

// Re-export the storage traits from types crate
pub use usdc_types::storage::{SessionStorage, StorageError, StorageResult};
