//! USDC Router Storage
//!
//! The keyed async cache shared by all provider-backed collections, and
//! in-memory session persistence.

pub mod keyed_cache;
pub mod memory_store;
pub mod traits;

pub use keyed_cache::KeyedCache;
pub use memory_store::MemoryStore;
pub use traits::{SessionStorage, StorageError, StorageResult};
