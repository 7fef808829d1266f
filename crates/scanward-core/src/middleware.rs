//! Tower middleware applying the scan filter in front of a service.
//!
//! Per request: resolve the client address, classify it, and either bypass,
//! forward while recording the response outcome, or answer with a punitive
//! response. The filter never fails a request out of its own state; anything
//! it cannot attribute to a client passes through untouched.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use futures::future::BoxFuture;
use hyper::Request;
use tower::{Layer, Service};

use crate::addr::client_ip;
use crate::decoy;
use crate::engine::{ScanFilter, Verdict};

/// Scan filter middleware layer.
#[derive(Clone)]
pub struct ScanFilterLayer {
	filter: Arc<ScanFilter>,
}

impl ScanFilterLayer {
	pub fn new(filter: Arc<ScanFilter>) -> Self {
		Self { filter }
	}
}

impl<S> Layer<S> for ScanFilterLayer {
	type Service = ScanFilterService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		ScanFilterService { inner, filter: self.filter.clone() }
	}
}

/// Scan filter middleware service.
#[derive(Clone)]
pub struct ScanFilterService<S> {
	inner: S,
	filter: Arc<ScanFilter>,
}

impl<S> Service<Request<Body>> for ScanFilterService<S>
where
	S: Service<Request<Body>, Response = axum::response::Response> + Clone + Send + 'static,
	S::Future: Send + 'static,
{
	type Response = S::Response;
	type Error = S::Error;
	type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: Request<Body>) -> Self::Future {
		let filter = self.filter.clone();
		let mut inner = self.inner.clone();

		Box::pin(async move {
			let ip = client_ip(&req, filter.config().behind_proxy);

			match filter.classify(ip) {
				Verdict::Bypass => inner.call(req).await,
				Verdict::Allow(entry) => {
					entry.record_request();

					// Forward and observe the outcome: a 4xx response counts
					// as one more scan request for this client.
					let response = inner.call(req).await?;
					if response.status().is_client_error() {
						entry.record_scan();
					}
					Ok(response)
				}
				Verdict::Block => {
					// The body is never forwarded or read on the block path;
					// dropping it keeps the borrowed request `Sync` so the
					// boxed future stays `Send`.
					let (parts, _body) = req.into_parts();
					let req = Request::from_parts(parts, ());
					Ok(decoy::respond(&filter, &req).await)
				}
			}
		})
	}
}


// vim: ts=4
