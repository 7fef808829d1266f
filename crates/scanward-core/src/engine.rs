//! Blocking decision engine.
//!
//! Classifies each request against the client's tracking entry and decides
//! whether to bypass the filter, forward and track the outcome, or block.
//! The conditions form an ordered set where the first match wins, mirroring
//! the state machine: `Tracking -> Blocked` when all three thresholds hold
//! at once, `Blocked -> Tracking` when the quiet period since the last
//! tracked request exceeds the block duration.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{debug, info};

use crate::addr::is_excluded;
use crate::config::FilterConfig;
use crate::entry::{unix_now, ClientEntry};
use crate::store::ClientStore;

/// Outcome of classifying one request.
#[derive(Debug)]
pub enum Verdict {
	/// The request is not tracked at all and proceeds untouched.
	Bypass,
	/// The request proceeds; its response status must be recorded against
	/// the entry.
	Allow(Arc<ClientEntry>),
	/// The request must not be forwarded.
	Block,
}

/// The scan filter: a client store plus the configured thresholds.
pub struct ScanFilter {
	config: FilterConfig,
	store: Arc<ClientStore>,
}

impl ScanFilter {
	pub fn new(config: FilterConfig) -> Self {
		info!("creating scan filter with config: {:?}", config);
		Self { config, store: Arc::new(ClientStore::new()) }
	}

	pub fn config(&self) -> &FilterConfig {
		&self.config
	}

	pub fn store(&self) -> &Arc<ClientStore> {
		&self.store
	}

	/// Classify a request from `addr`.
	///
	/// Resolves (or creates) the tracking entry and applies the blocking
	/// conditions in order. `last_seen` is updated after the verdict is
	/// determined, so the unblock check always sees the value from the
	/// previous request.
	pub fn classify(&self, addr: Option<IpAddr>) -> Verdict {
		// Unresolvable addresses fail open.
		let Some(addr) = addr else {
			return Verdict::Bypass;
		};
		if is_excluded(&addr, self.config.block_private) {
			return Verdict::Bypass;
		}

		let key = addr.to_string();
		let entry = self.store.get_or_create(&key);
		let now = unix_now();
		let verdict = self.check(&key, &entry, now);
		entry.last_seen.store(now, Ordering::Relaxed);
		verdict
	}

	fn check(&self, key: &str, entry: &Arc<ClientEntry>, now: i64) -> Verdict {
		if entry.is_blocking() {
			// Already blocking this client. Unblock once the gap since the
			// last tracked request exceeds the block duration; a client that
			// keeps sending faster than that keeps resetting its own clock
			// and stays blocked.
			if entry.last_seen.load(Ordering::Relaxed) < now - self.config.block_secs as i64 {
				debug!("unblocking {} after quiet period", key);
				entry.blocking.store(false, Ordering::Relaxed);
				return Verdict::Allow(entry.clone());
			}
			return Verdict::Block;
		}

		let scan = entry.scan_requests.load(Ordering::Relaxed);
		if scan < self.config.min_scan_requests {
			// Not reached minimum scan requests.
			return Verdict::Allow(entry.clone());
		}
		let total = entry.total_requests.load(Ordering::Relaxed);
		if total < self.config.min_total_requests {
			// Not reached minimum total requests.
			return Verdict::Allow(entry.clone());
		}
		if (scan as f64 / total as f64) * 100.0 < self.config.min_scan_percent {
			// Not reached minimum scan request percentage.
			return Verdict::Allow(entry.clone());
		}

		info!(
			"now blocking {} for {}s (seen={}s total={} 4xx={})",
			key,
			self.config.block_secs,
			now - entry.first_seen.load(Ordering::Relaxed),
			total,
			scan,
		);
		entry.blocking.store(true, Ordering::Relaxed);
		Verdict::Block
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::net::Ipv4Addr;

	const CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 10));

	fn filter() -> ScanFilter {
		ScanFilter::new(FilterConfig::default())
	}

	#[test]
	fn test_first_request_is_never_blocked() {
		let filter = filter();
		assert!(matches!(filter.classify(Some(CLIENT)), Verdict::Allow(_)));
	}

	#[test]
	fn test_unresolvable_address_bypasses() {
		let filter = filter();
		assert!(matches!(filter.classify(None), Verdict::Bypass));
		assert!(filter.store().is_empty());
	}

	#[test]
	fn test_loopback_bypasses_without_entry() {
		let filter = filter();
		let loopback: IpAddr = "127.0.0.1".parse().unwrap();
		for _ in 0..50 {
			assert!(matches!(filter.classify(Some(loopback)), Verdict::Bypass));
		}
		assert!(filter.store().is_empty());
	}

	#[test]
	fn test_private_bypasses_unless_configured() {
		let private: IpAddr = "10.1.2.3".parse().unwrap();

		let filter = filter();
		assert!(matches!(filter.classify(Some(private)), Verdict::Bypass));
		assert!(filter.store().is_empty());

		let filter = ScanFilter::new(FilterConfig { block_private: true, ..FilterConfig::default() });
		assert!(matches!(filter.classify(Some(private)), Verdict::Allow(_)));
		assert_eq!(filter.store().len(), 1);
	}

	#[test]
	fn test_threshold_conjunction_triggers_block() {
		// minScanRequests=10, minTotalRequests=10, minScanPercent=25.
		let filter = filter();

		// 20 requests, 6 of them answered 4xx: ratio 30% but only 6 scan
		// requests, so the client keeps tracking.
		let entry = filter.store().get_or_create(&CLIENT.to_string());
		entry.total_requests.store(20, Ordering::Relaxed);
		entry.scan_requests.store(6, Ordering::Relaxed);
		assert!(matches!(filter.classify(Some(CLIENT)), Verdict::Allow(_)));
		assert!(!entry.is_blocking());

		// 4 more 4xx responses: 10 of 24 (~41.7%) crosses all thresholds.
		entry.total_requests.store(24, Ordering::Relaxed);
		entry.scan_requests.store(10, Ordering::Relaxed);
		assert!(matches!(filter.classify(Some(CLIENT)), Verdict::Block));
		assert!(entry.is_blocking());
	}

	#[test]
	fn test_low_ratio_keeps_tracking() {
		let filter = filter();
		let entry = filter.store().get_or_create(&CLIENT.to_string());
		// 10 scan requests but only 10% of total.
		entry.total_requests.store(100, Ordering::Relaxed);
		entry.scan_requests.store(10, Ordering::Relaxed);
		assert!(matches!(filter.classify(Some(CLIENT)), Verdict::Allow(_)));
		assert!(!entry.is_blocking());
	}

	#[test]
	fn test_busy_blocked_client_stays_blocked() {
		let filter = filter();
		let entry = filter.store().get_or_create(&CLIENT.to_string());
		entry.blocking.store(true, Ordering::Relaxed);

		// Every classification refreshes last_seen, so a client hammering
		// away more often than block_secs never sees the quiet period.
		for _ in 0..10 {
			entry.last_seen.store(unix_now() - 30, Ordering::Relaxed);
			assert!(matches!(filter.classify(Some(CLIENT)), Verdict::Block));
			assert!(entry.is_blocking());
		}
	}

	#[test]
	fn test_quiet_blocked_client_unblocks() {
		// block_secs=600; the client was last seen 601 seconds ago.
		let filter = filter();
		let entry = filter.store().get_or_create(&CLIENT.to_string());
		entry.blocking.store(true, Ordering::Relaxed);
		entry.last_seen.store(unix_now() - 601, Ordering::Relaxed);

		assert!(matches!(filter.classify(Some(CLIENT)), Verdict::Allow(_)));
		assert!(!entry.is_blocking());
	}

	#[test]
	fn test_last_seen_updated_on_every_pass() {
		let filter = filter();
		let before = unix_now();
		filter.classify(Some(CLIENT));
		let entry = filter.store().get(&CLIENT.to_string()).unwrap();
		let last_seen = entry.last_seen.load(Ordering::Relaxed);
		assert!(last_seen >= before);
		assert!(entry.first_seen.load(Ordering::Relaxed) <= last_seen);
	}
}

// vim: ts=4
