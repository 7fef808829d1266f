//! Concurrent client store with rate-limited eviction.
//!
//! The store maps client keys (canonical IP strings) to tracking entries.
//! Lookups take a read lock, structural changes (insert, sweep) take the
//! write lock, and entry field updates take no lock at all. A single
//! process-wide timestamp throttles eviction sweeps so at most one caller
//! per cooldown window pays for the removal pass.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use crate::entry::{unix_now, ClientEntry};

/// Minimum wait between two eviction sweeps.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Concurrent map of client keys to tracking entries.
pub struct ClientStore {
	entries: RwLock<HashMap<Box<str>, Arc<ClientEntry>>>,
	last_sweep: AtomicI64,
}

impl ClientStore {
	pub fn new() -> Self {
		Self {
			entries: RwLock::new(HashMap::with_capacity(10_000)),
			last_sweep: AtomicI64::new(0),
		}
	}

	/// Look up an existing entry. Read-locks the store.
	pub fn get(&self, key: &str) -> Option<Arc<ClientEntry>> {
		self.entries.read().get(key).cloned()
	}

	/// Return the entry for `key`, creating it if this is the first time
	/// the client is seen. The insert re-checks existence under the write
	/// lock, so concurrent callers with the same key always end up sharing
	/// a single entry.
	pub fn get_or_create(&self, key: &str) -> Arc<ClientEntry> {
		if let Some(entry) = self.entries.read().get(key) {
			return entry.clone();
		}

		let mut entries = self.entries.write();
		if let Some(entry) = entries.get(key) {
			return entry.clone();
		}

		let entry = Arc::new(ClientEntry::default());
		entry.first_seen.store(unix_now(), Ordering::Relaxed);
		entries.insert(key.into(), entry.clone());
		entry
	}

	/// Number of tracked clients.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Remove all entries that were last seen more than `max_age` ago.
	///
	/// Throttled: the removal pass only runs if the previous sweep started
	/// at least [`MIN_SWEEP_INTERVAL`] ago. The throttle is a compare-and-
	/// swap on the last sweep timestamp, so under concurrent callers exactly
	/// one performs the pass and the losers return 0 without doing any work.
	pub fn sweep(&self, max_age: Duration) -> usize {
		let now = unix_now();
		let last_sweep = self.last_sweep.load(Ordering::Relaxed);
		if last_sweep > now - MIN_SWEEP_INTERVAL.as_secs() as i64 {
			// Swept recently, skip this time.
			return 0;
		}
		if self
			.last_sweep
			.compare_exchange(last_sweep, now, Ordering::Relaxed, Ordering::Relaxed)
			.is_err()
		{
			// Another caller just started sweeping.
			return 0;
		}

		let cutoff = now - max_age.as_secs() as i64;

		let mut entries = self.entries.write();
		let before = entries.len();
		entries.retain(|_, entry| entry.last_seen.load(Ordering::Relaxed) >= cutoff);
		let removed = before - entries.len();
		debug!("sweep removed {} of {} client entries", removed, before);
		removed
	}
}

impl Default for ClientStore {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_get_or_create_returns_same_entry() {
		let store = ClientStore::new();
		assert!(store.get("192.0.2.1").is_none());

		let a = store.get_or_create("192.0.2.1");
		let b = store.get_or_create("192.0.2.1");
		assert!(Arc::ptr_eq(&a, &b));
		assert_eq!(store.len(), 1);

		let c = store.get("192.0.2.1").unwrap();
		assert!(Arc::ptr_eq(&a, &c));
	}

	#[test]
	fn test_first_seen_set_at_creation() {
		let store = ClientStore::new();
		let before = unix_now();
		let entry = store.get_or_create("192.0.2.1");
		let first_seen = entry.first_seen.load(Ordering::Relaxed);
		assert!(first_seen >= before);
		assert!(first_seen <= unix_now());
	}

	#[test]
	fn test_concurrent_get_or_create_single_entry() {
		let store = Arc::new(ClientStore::new());
		let mut handles = Vec::new();
		for _ in 0..8 {
			let store = store.clone();
			handles.push(std::thread::spawn(move || store.get_or_create("198.51.100.7")));
		}
		let entries: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
		assert_eq!(store.len(), 1);
		for entry in &entries[1..] {
			assert!(Arc::ptr_eq(&entries[0], entry));
		}
	}

	#[test]
	fn test_sweep_removes_only_stale_entries() {
		let store = ClientStore::new();
		let now = unix_now();

		let stale = store.get_or_create("192.0.2.1");
		stale.last_seen.store(now - 7200, Ordering::Relaxed);
		let fresh = store.get_or_create("192.0.2.2");
		fresh.last_seen.store(now - 60, Ordering::Relaxed);

		let removed = store.sweep(Duration::from_secs(3600));
		assert_eq!(removed, 1);
		assert!(store.get("192.0.2.1").is_none());
		assert!(store.get("192.0.2.2").is_some());
	}

	#[test]
	fn test_sweep_is_throttled() {
		let store = ClientStore::new();
		let now = unix_now();

		let stale = store.get_or_create("192.0.2.1");
		stale.last_seen.store(now - 7200, Ordering::Relaxed);

		assert_eq!(store.sweep(Duration::from_secs(3600)), 1);

		// A second stale entry within the cooldown window is not removed.
		let stale = store.get_or_create("192.0.2.9");
		stale.last_seen.store(now - 7200, Ordering::Relaxed);
		assert_eq!(store.sweep(Duration::from_secs(3600)), 0);
		assert!(store.get("192.0.2.9").is_some());

		// Pretend the cooldown has elapsed and sweep again.
		store.last_sweep.store(now - MIN_SWEEP_INTERVAL.as_secs() as i64 - 1, Ordering::Relaxed);
		assert_eq!(store.sweep(Duration::from_secs(3600)), 1);
		assert!(store.get("192.0.2.9").is_none());
	}

	#[test]
	fn test_sweep_mixed_ages() {
		let store = ClientStore::new();
		let now = unix_now();

		for (i, age) in [10i64, 100, 1000, 5000, 20_000].iter().enumerate() {
			let entry = store.get_or_create(&format!("203.0.113.{}", i));
			entry.last_seen.store(now - age, Ordering::Relaxed);
		}

		assert_eq!(store.sweep(Duration::from_secs(2000)), 2);
		assert_eq!(store.len(), 3);
	}
}

// vim: ts=4
