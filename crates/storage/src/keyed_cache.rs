//! Keyed async cache with per-key loading/error state
//!
//! Every fetch is tagged with a generation drawn from one monotonic counter. A
//! resolution or rejection is applied only while its generation is still the
//! row's latest, so a slow fetch can never overwrite the result of a newer one.
//! The cache never fails: it records whatever its callers pass in.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use usdc_types::{CacheEvent, CacheEventKind, CacheRow, FetchTicket};

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct KeyedCache<T, E = String> {
	rows: Arc<DashMap<String, CacheRow<T, E>>>,
	generation: Arc<AtomicU64>,
	events: broadcast::Sender<CacheEvent>,
}

impl<T, E> Clone for KeyedCache<T, E> {
	fn clone(&self) -> Self {
		Self {
			rows: Arc::clone(&self.rows),
			generation: Arc::clone(&self.generation),
			events: self.events.clone(),
		}
	}
}

impl<T, E> Default for KeyedCache<T, E>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<T, E> KeyedCache<T, E>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	pub fn new() -> Self {
		let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
		Self {
			rows: Arc::new(DashMap::new()),
			generation: Arc::new(AtomicU64::new(0)),
			events,
		}
	}

	fn next_generation(&self) -> u64 {
		self.generation.fetch_add(1, Ordering::SeqCst) + 1
	}

	fn emit(&self, key: &str, generation: u64, kind: CacheEventKind) {
		// No subscribers is fine
		let _ = self.events.send(CacheEvent {
			key: key.to_string(),
			generation,
			kind,
		});
	}

	pub fn get(&self, key: &str) -> Option<CacheRow<T, E>> {
		self.rows.get(key).map(|row| row.clone())
	}

	pub fn is_loading(&self, key: &str) -> bool {
		self.rows.get(key).map(|row| row.is_loading).unwrap_or(false)
	}

	/// Ticket of the fetch currently in flight for `key`, if any
	pub fn in_flight(&self, key: &str) -> Option<FetchTicket> {
		self.rows
			.get(key)
			.filter(|row| row.is_loading)
			.map(|row| FetchTicket {
				key: key.to_string(),
				generation: row.generation,
			})
	}

	/// Mark `key` as loading under a new generation.
	///
	/// Inserts a loading row holding `placeholder` when absent; otherwise keeps the
	/// row's data and clears its error.
	pub fn begin_fetch(&self, key: &str, placeholder: Option<T>) -> FetchTicket {
		let generation = {
			let mut entry = self.rows.entry(key.to_string()).or_insert_with(|| {
				CacheRow::loading(key.to_string(), None, 0)
			});
			let generation = self.next_generation();
			let row = entry.value_mut();
			if row.data.is_none() {
				row.data = placeholder;
			}
			row.is_loading = true;
			row.error = None;
			row.generation = generation;
			generation
		};

		debug!("Cache fetch started for {} (generation {})", key, generation);
		self.emit(key, generation, CacheEventKind::Loading);
		FetchTicket {
			key: key.to_string(),
			generation,
		}
	}

	/// Apply a successful result; returns false when the ticket was superseded
	pub fn resolve(&self, ticket: &FetchTicket, data: T) -> bool {
		let applied = match self.rows.get_mut(&ticket.key) {
			Some(mut row) if row.generation == ticket.generation => {
				row.data = Some(data);
				row.is_loading = false;
				row.error = None;
				row.fetched_at = Some(Utc::now());
				true
			},
			_ => false,
		};

		if applied {
			self.emit(&ticket.key, ticket.generation, CacheEventKind::Resolved);
		} else {
			warn!(
				"Discarding stale resolution for {} (generation {})",
				ticket.key, ticket.generation
			);
		}
		applied
	}

	/// Apply a failure, keeping any previous data; returns false when superseded
	pub fn reject(&self, ticket: &FetchTicket, error: E) -> bool {
		let applied = match self.rows.get_mut(&ticket.key) {
			Some(mut row) if row.generation == ticket.generation => {
				row.is_loading = false;
				row.error = Some(error);
				true
			},
			_ => false,
		};

		if applied {
			self.emit(&ticket.key, ticket.generation, CacheEventKind::Rejected);
		} else {
			warn!(
				"Discarding stale rejection for {} (generation {})",
				ticket.key, ticket.generation
			);
		}
		applied
	}

	/// Write a settled row directly, superseding any fetch in flight for `key`
	pub fn insert_resolved(&self, key: &str, data: T) -> u64 {
		let generation = {
			let mut entry = self.rows.entry(key.to_string()).or_insert_with(|| {
				CacheRow::loading(key.to_string(), None, 0)
			});
			let generation = self.next_generation();
			*entry.value_mut() = CacheRow::resolved(key.to_string(), data, generation);
			generation
		};
		self.emit(key, generation, CacheEventKind::Resolved);
		generation
	}

	pub fn remove(&self, key: &str) -> Option<CacheRow<T, E>> {
		let removed = self.rows.remove(key).map(|(_, row)| row);
		if let Some(row) = &removed {
			self.emit(key, row.generation, CacheEventKind::Removed);
		}
		removed
	}

	pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
		self.rows
			.iter()
			.filter(|entry| entry.key().starts_with(prefix))
			.map(|entry| entry.key().clone())
			.collect()
	}

	/// Remove rows under `prefix` that `keep` rejects; returns removed keys
	pub fn remove_where<F>(&self, prefix: &str, keep: F) -> Vec<String>
	where
		F: Fn(&str) -> bool,
	{
		let stale: Vec<String> = self
			.keys_with_prefix(prefix)
			.into_iter()
			.filter(|key| !keep(key))
			.collect();
		for key in &stale {
			self.remove(key);
		}
		stale
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// Receiver of every subsequent write
	pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
		self.events.subscribe()
	}

	/// Wait until `key` is no longer loading and return its row
	pub async fn wait_settled(&self, key: &str) -> Option<CacheRow<T, E>> {
		let mut events = self.subscribe();
		loop {
			match self.get(key) {
				Some(row) if row.is_loading => {},
				settled => return settled,
			}

			// Any event (or a lag) means the row may have changed; re-check it
			if let Err(broadcast::error::RecvError::Closed) = events.recv().await {
				return self.get(key);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[test]
	fn test_begin_fetch_inserts_loading_row() {
		let cache: KeyedCache<u32> = KeyedCache::new();
		let ticket = cache.begin_fetch("fees:0:6", Some(0));
		let row = cache.get("fees:0:6").unwrap();
		assert!(row.is_loading);
		assert_eq!(row.data, Some(0));
		assert_eq!(row.generation, ticket.generation);
		assert_eq!(cache.in_flight("fees:0:6"), Some(ticket));
	}

	#[test]
	fn test_resolve_then_reject_keeps_stale_data() {
		let cache: KeyedCache<u32> = KeyedCache::new();
		let first = cache.begin_fetch("k", None);
		assert!(cache.resolve(&first, 42));

		let second = cache.begin_fetch("k", None);
		let row = cache.get("k").unwrap();
		assert!(row.is_loading);
		assert_eq!(row.data, Some(42));

		assert!(cache.reject(&second, "HTTP 500".to_string()));
		let row = cache.get("k").unwrap();
		assert!(!row.is_loading);
		assert_eq!(row.data, Some(42));
		assert_eq!(row.error.as_deref(), Some("HTTP 500"));
		assert!(row.is_error());
	}

	#[test]
	fn test_begin_fetch_clears_error() {
		let cache: KeyedCache<u32> = KeyedCache::new();
		let ticket = cache.begin_fetch("k", None);
		cache.reject(&ticket, "boom".to_string());
		cache.begin_fetch("k", None);
		assert!(cache.get("k").unwrap().error.is_none());
	}

	#[test]
	fn test_out_of_order_resolution_discarded() {
		let cache: KeyedCache<&'static str> = KeyedCache::new();
		let slow = cache.begin_fetch("k", None);
		let fast = cache.begin_fetch("k", None);
		assert!(fast.generation > slow.generation);

		assert!(cache.resolve(&fast, "fresh"));
		assert!(!cache.resolve(&slow, "stale"));
		assert!(!cache.reject(&slow, "late error".to_string()));

		let row = cache.get("k").unwrap();
		assert_eq!(row.data, Some("fresh"));
		assert!(row.error.is_none());
	}

	#[test]
	fn test_insert_resolved_supersedes_in_flight() {
		let cache: KeyedCache<u32> = KeyedCache::new();
		let ticket = cache.begin_fetch("k", None);
		cache.insert_resolved("k", 7);
		assert!(!cache.resolve(&ticket, 1));
		assert_eq!(cache.get("k").unwrap().data, Some(7));
	}

	#[test]
	fn test_resolution_after_remove_is_discarded() {
		let cache: KeyedCache<u32> = KeyedCache::new();
		let ticket = cache.begin_fetch("k", None);
		cache.remove("k");
		assert!(!cache.resolve(&ticket, 1));
		assert!(cache.get("k").is_none());
	}

	#[test]
	fn test_remove_where_prunes_prefix_only() {
		let cache: KeyedCache<u32> = KeyedCache::new();
		cache.insert_resolved("routes:a:r1", 1);
		cache.insert_resolved("routes:a:r2", 2);
		cache.insert_resolved("routes:b:r1", 3);

		let removed = cache.remove_where("routes:a:", |key| key.ends_with("r1"));
		assert_eq!(removed, vec!["routes:a:r2".to_string()]);
		assert!(cache.get("routes:a:r1").is_some());
		assert!(cache.get("routes:b:r1").is_some());
		assert_eq!(cache.len(), 2);
	}

	#[tokio::test]
	async fn test_subscribers_see_writes() {
		let cache: KeyedCache<u32> = KeyedCache::new();
		let mut events = cache.subscribe();
		let ticket = cache.begin_fetch("k", None);
		cache.resolve(&ticket, 5);

		let first = events.recv().await.unwrap();
		let second = events.recv().await.unwrap();
		assert_eq!(first.kind, CacheEventKind::Loading);
		assert_eq!(second.kind, CacheEventKind::Resolved);
		assert_eq!(second.generation, ticket.generation);
	}

	#[tokio::test]
	async fn test_wait_settled() {
		let cache: KeyedCache<u32> = KeyedCache::new();
		let ticket = cache.begin_fetch("k", None);

		let resolver = cache.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(20)).await;
			resolver.resolve(&ticket, 9);
		});

		let row = tokio::time::timeout(Duration::from_secs(2), cache.wait_settled("k"))
			.await
			.unwrap()
			.unwrap();
		assert_eq!(row.data, Some(9));
		assert!(cache.wait_settled("missing").await.is_none());
	}
}
