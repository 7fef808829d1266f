//! Webserver implementation
//!
//! Serves each accepted connection manually instead of through a prebuilt
//! server so every connection carries a takeover handle: the decoy layer
//! can cancel it to forcibly tear the connection down, which is not
//! something the regular response path can express.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::Router;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tower::Service;
use tower_http::trace::TraceLayer;

use scanward_core::{ConnGuard, ScanFilterLayer};

use crate::prelude::*;
use crate::proxy;

/// Build the proxy router: every request goes through the scan filter and,
/// if allowed, on to the upstream forwarder.
pub fn build_router(app: &App) -> Router {
	Router::new()
		.fallback(proxy::forward)
		.layer(ScanFilterLayer::new(app.filter.clone()))
		.layer(TraceLayer::new_for_http())
		.with_state(app.clone())
}

/// Accept loop. Runs until the listener fails.
pub async fn serve(app: App) -> Result<()> {
	let listener = TcpListener::bind(&app.config.listen).await?;
	info!("scanward v{} listening on {}", crate::app::VERSION, app.config.listen);
	info!("forwarding to upstream {}", app.upstream);

	let router = build_router(&app);
	loop {
		let (stream, peer) = listener.accept().await?;
		tokio::spawn(handle_connection(stream, peer, router.clone()));
	}
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, router: Router) {
	let token = CancellationToken::new();
	let guard = ConnGuard::new(token.clone());

	let service = hyper::service::service_fn(move |mut req: hyper::Request<Incoming>| {
		let mut router = router.clone();
		let guard = guard.clone();
		async move {
			req.extensions_mut().insert(ConnectInfo(peer));
			req.extensions_mut().insert(guard);
			router.call(req.map(Body::new)).await
		}
	});

	let builder = auto::Builder::new(TokioExecutor::new());
	let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
	tokio::pin!(conn);

	tokio::select! {
		result = conn.as_mut() => {
			if let Err(err) = result {
				debug!("connection from {} ended: {}", peer, err);
			}
		}
		() = token.cancelled() => {
			// A decoy strategy took the connection over; drop it without a
			// response.
			debug!("connection from {} torn down", peer);
		}
	}
}

// vim: ts=4
