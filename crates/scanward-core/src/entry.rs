//! Per-client tracking entry.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix timestamp in seconds.
pub fn unix_now() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs() as i64)
		.unwrap_or(0)
}

/// Tracking state for a single client address.
///
/// Every field is an independent atomic, so concurrent requests from the
/// same client can update state without serializing on a per-entry lock.
/// Slight races between counters and the blocking flag are tolerated: the
/// counts are advisory triggers, not exact accounting.
#[derive(Debug, Default)]
pub struct ClientEntry {
	/// Requests seen from this client.
	pub total_requests: AtomicU64,
	/// Requests from this client answered with a 4xx status.
	pub scan_requests: AtomicU64,
	/// Unix seconds of the first observed request, set once at creation.
	pub first_seen: AtomicI64,
	/// Unix seconds of the most recent classification pass.
	pub last_seen: AtomicI64,
	/// Whether this client is currently blocked.
	pub blocking: AtomicBool,
}

impl ClientEntry {
	/// Count one more request from this client.
	pub fn record_request(&self) {
		self.total_requests.fetch_add(1, Ordering::Relaxed);
	}

	/// Count one more 4xx response sent to this client.
	pub fn record_scan(&self) {
		self.scan_requests.fetch_add(1, Ordering::Relaxed);
	}

	pub fn is_blocking(&self) -> bool {
		self.blocking.load(Ordering::Relaxed)
	}
}


// vim: ts=4
