//! Scanward is a scan-blocking HTTP reverse proxy.
//!
//! It sits in front of a backend, attributes every request to its source
//! address, and tracks how many of each client's requests end in 4xx
//! responses. A client whose profile looks like scanning (many error-class
//! responses relative to total traffic) is blocked for a bounded period,
//! during which its requests are rejected or actively deceived instead of
//! forwarded.
//!
//! The detection engine lives in `scanward-core`; this crate wires it into
//! a running proxy: configuration, logging, upstream forwarding, and the
//! accept loop that gives the decoy layer its connection-takeover
//! capability.

#![forbid(unsafe_code)]

pub mod app;
pub mod config;
pub mod error;
pub mod prelude;
pub mod proxy;
pub mod webserver;

use crate::prelude::*;

/// Load configuration, build the app state, and serve until shutdown.
pub async fn run() -> Result<()> {
	let config = config::ServerConfig::load_default()?;
	let app = app::AppState::new(config)?;
	webserver::serve(app).await
}

// vim: ts=4
