//! Upstream forwarding for allowed requests.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use crate::prelude::*;

/// Headers that must not be forwarded between client and backend.
const HOP_BY_HOP_HEADERS: &[&str] = &[
	"connection",
	"keep-alive",
	"proxy-authenticate",
	"proxy-authorization",
	"te",
	"trailers",
	"transfer-encoding",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
	HOP_BY_HOP_HEADERS.iter().any(|h| name.as_str().eq_ignore_ascii_case(h))
}

/// Combine the upstream base URI with the path and query of the original
/// request.
fn build_upstream_uri(upstream: &Uri, original: &Uri) -> Result<Uri> {
	let mut path_and_query =
		format!("{}{}", upstream.path().trim_end_matches('/'), original.path());
	if let Some(query) = original.query() {
		path_and_query.push('?');
		path_and_query.push_str(query);
	}

	let mut parts = upstream.clone().into_parts();
	parts.path_and_query = Some(
		path_and_query
			.parse()
			.map_err(|err| Error::Internal(format!("failed to build upstream path: {}", err)))?,
	);
	Uri::from_parts(parts)
		.map_err(|err| Error::Internal(format!("failed to build upstream URI: {}", err)))
}

/// Copy non-hop-by-hop headers from source to destination.
fn copy_headers(src: &HeaderMap, dst: &mut HeaderMap) {
	for (name, value) in src {
		if !is_hop_by_hop(name) {
			dst.append(name.clone(), value.clone());
		}
	}
}

/// Forward a request to the configured upstream. Used as the catch-all
/// handler behind the scan filter layer; upstream failures surface as 502.
pub async fn forward(State(app): State<App>, req: Request<Body>) -> Response {
	match forward_inner(&app, req).await {
		Ok(response) => response,
		Err(err) => {
			warn!("failed to forward request: {}", err);
			(StatusCode::BAD_GATEWAY, "bad gateway\n").into_response()
		}
	}
}

async fn forward_inner(app: &App, req: Request<Body>) -> Result<Response> {
	let peer_ip = req
		.extensions()
		.get::<ConnectInfo<SocketAddr>>()
		.map(|ci| ci.0.ip().to_string());

	let uri = build_upstream_uri(&app.upstream, req.uri())?;
	debug!("forwarding {} {} to {}", req.method(), req.uri().path(), uri);

	let (parts, body) = req.into_parts();

	let mut headers = HeaderMap::new();
	copy_headers(&parts.headers, &mut headers);

	// Tell the backend who actually sent this.
	if let Some(peer_ip) = peer_ip {
		if let Ok(value) = HeaderValue::from_str(&peer_ip) {
			headers.insert(HeaderName::from_static("x-forwarded-for"), value.clone());
			headers.insert(HeaderName::from_static("x-real-ip"), value);
		}
	}
	headers
		.insert(HeaderName::from_static("x-forwarded-proto"), HeaderValue::from_static("http"));
	if let Some(host) = parts.headers.get(header::HOST) {
		headers.insert(header::HOST, host.clone());
	}

	let mut upstream_req = hyper::Request::builder()
		.method(parts.method)
		.uri(uri)
		.body(body)
		.map_err(|err| Error::Internal(format!("failed to build upstream request: {}", err)))?;
	*upstream_req.headers_mut() = headers;

	let response = app
		.client
		.request(upstream_req)
		.await
		.map_err(|err| Error::Upstream(err.to_string()))?;

	Ok(response.map(Body::new).into_response())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn uri(s: &str) -> Uri {
		s.parse().unwrap()
	}

	#[test]
	fn test_build_upstream_uri_plain() {
		let combined = build_upstream_uri(&uri("http://backend:8000"), &uri("/api/v1/items")).unwrap();
		assert_eq!(combined.to_string(), "http://backend:8000/api/v1/items");
	}

	#[test]
	fn test_build_upstream_uri_keeps_query() {
		let combined =
			build_upstream_uri(&uri("http://backend:8000"), &uri("/search?q=x&page=2")).unwrap();
		assert_eq!(combined.to_string(), "http://backend:8000/search?q=x&page=2");
	}

	#[test]
	fn test_build_upstream_uri_joins_base_path() {
		let combined = build_upstream_uri(&uri("http://backend:8000/app/"), &uri("/login")).unwrap();
		assert_eq!(combined.to_string(), "http://backend:8000/app/login");
	}

	#[test]
	fn test_hop_by_hop_headers_are_stripped() {
		let mut src = HeaderMap::new();
		src.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
		src.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
		src.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

		let mut dst = HeaderMap::new();
		copy_headers(&src, &mut dst);

		assert!(dst.get(header::CONNECTION).is_none());
		assert!(dst.get(header::TRANSFER_ENCODING).is_none());
		assert!(dst.get(header::ACCEPT).is_some());
	}
}

// vim: ts=4
