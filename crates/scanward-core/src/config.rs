//! Filter configuration and defaults.

use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_MIN_SCAN_REQUESTS: u64 = 10;
pub const DEFAULT_MIN_TOTAL_REQUESTS: u64 = 10;
pub const DEFAULT_MIN_SCAN_PERCENT: f64 = 25.0;
/// 10 minutes
pub const DEFAULT_BLOCK_SECS: u64 = 600;
/// 6 hours
pub const DEFAULT_REMEMBER_SECS: u64 = 6 * 3600;

/// Thresholds and policy knobs for the scan filter.
///
/// All fields are optional in the configuration file and fall back to the
/// defaults above.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
	/// Minimum 4xx responses to observe before blocking a client.
	pub min_scan_requests: u64,
	/// Minimum total requests to observe before blocking a client.
	pub min_total_requests: u64,
	/// Minimum percentage of 4xx responses of total requests before
	/// blocking a client.
	pub min_scan_percent: f64,
	/// Track and block private ranges (RFC1918, RFC4193) too.
	pub block_private: bool,
	/// Answer blocked clients with randomized decoy responses instead of a
	/// plain rejection.
	pub play_decoys: bool,
	/// How long a client stays blocked without a sufficiently long quiet
	/// period, in seconds.
	pub block_secs: u64,
	/// How long a client entry is retained after it was last seen, in
	/// seconds.
	pub remember_secs: u64,
	/// Resolve the client address from forwarding headers instead of the
	/// peer address. Enable only when a trusted proxy sits in front.
	pub behind_proxy: bool,
}

impl Default for FilterConfig {
	fn default() -> Self {
		Self {
			min_scan_requests: DEFAULT_MIN_SCAN_REQUESTS,
			min_total_requests: DEFAULT_MIN_TOTAL_REQUESTS,
			min_scan_percent: DEFAULT_MIN_SCAN_PERCENT,
			block_private: false,
			play_decoys: false,
			block_secs: DEFAULT_BLOCK_SECS,
			remember_secs: DEFAULT_REMEMBER_SECS,
			behind_proxy: false,
		}
	}
}

impl FilterConfig {
	pub fn block_duration(&self) -> Duration {
		Duration::from_secs(self.block_secs)
	}

	pub fn remember_duration(&self) -> Duration {
		Duration::from_secs(self.remember_secs)
	}
}


// vim: ts=4
