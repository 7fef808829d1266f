//! Server configuration loading.
//!
//! The server reads a single YAML file; every field is optional. The path
//! comes from `SCANWARD_CONFIG`, defaulting to `scanward.yaml` in the
//! working directory, and a missing file just means defaults.

use std::path::Path;

use axum::http::Uri;
use serde::Deserialize;

use scanward_core::FilterConfig;

use crate::prelude::*;

pub const CONFIG_PATH_ENV: &str = "SCANWARD_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "scanward.yaml";

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
	/// Address the proxy listens on.
	pub listen: String,
	/// Base URL of the backend requests are forwarded to.
	pub upstream: String,
	/// Scan filter thresholds and policy.
	pub filter: FilterConfig,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			listen: "0.0.0.0:8080".into(),
			upstream: "http://127.0.0.1:3000".into(),
			filter: FilterConfig::default(),
		}
	}
}

impl ServerConfig {
	pub fn load(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path)?;
		Ok(serde_yaml::from_str(&raw)?)
	}

	/// Load the configuration from the path given by [`CONFIG_PATH_ENV`],
	/// falling back to defaults when no file is present.
	pub fn load_default() -> Result<Self> {
		let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
		let path = Path::new(&path);
		if path.exists() {
			info!("loading config from {}", path.display());
			Self::load(path)
		} else {
			info!("no config file at {}, using defaults", path.display());
			Ok(Self::default())
		}
	}

	pub fn upstream_uri(&self) -> Result<Uri> {
		self.upstream
			.parse()
			.map_err(|err| Error::Config(format!("invalid upstream URL {:?}: {}", self.upstream, err)))
	}
}


// vim: ts=4
