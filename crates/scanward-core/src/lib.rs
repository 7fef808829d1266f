//! Core scan-detection engine for the scanward reverse proxy filter.
//!
//! This crate contains the per-client tracking store, the blocking decision
//! engine built on it, and the tower middleware that applies both in front
//! of a forwarding service. The server crate wires these into an actual
//! reverse proxy; everything here only decorates HTTP types.
//!
//! The design goal is correctness under unbounded concurrent access: entry
//! fields are lock-free atomics, the store only takes its lock for
//! structural changes, and eviction is throttled with a compare-and-swap
//! token so the sweep cost stays off the request path.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod addr;
pub mod config;
pub mod decoy;
pub mod engine;
pub mod entry;
pub mod middleware;
pub mod store;

pub use addr::client_ip;
pub use config::FilterConfig;
pub use decoy::ConnGuard;
pub use engine::{ScanFilter, Verdict};
pub use entry::ClientEntry;
pub use middleware::{ScanFilterLayer, ScanFilterService};
pub use store::ClientStore;

// vim: ts=4
