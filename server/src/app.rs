//! App state type

use std::sync::Arc;

use axum::body::Body;
use axum::http::Uri;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use scanward_core::ScanFilter;

use crate::config::ServerConfig;
use crate::error::Result;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct AppState {
	pub config: ServerConfig,
	pub filter: Arc<ScanFilter>,
	/// Shared upstream HTTP client with connection pooling.
	pub client: Client<HttpConnector, Body>,
	pub upstream: Uri,
}

pub type App = Arc<AppState>;

impl AppState {
	pub fn new(config: ServerConfig) -> Result<App> {
		let upstream = config.upstream_uri()?;
		let filter = Arc::new(ScanFilter::new(config.filter.clone()));
		let client = Client::builder(TokioExecutor::new()).build_http();

		Ok(Arc::new(Self { config, filter, client, upstream }))
	}
}

// vim: ts=4
