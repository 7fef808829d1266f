//! Client address resolution and bypass policy.
//!
//! Resolves the source address of a request and decides which addresses the
//! filter never tracks. Anything that cannot be resolved fails open: the
//! request bypasses the filter entirely.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use hyper::Request;
use tracing::warn;

/// Resolve the client IP for a request.
///
/// Without `behind_proxy` the peer address from [`ConnectInfo`] is used
/// directly. With it, the forwarding headers set by a trusted fronting
/// proxy take precedence, falling back to the peer address.
pub fn client_ip<B>(req: &Request<B>, behind_proxy: bool) -> Option<IpAddr> {
	let ip = if behind_proxy {
		from_forwarded_for(req)
			.or_else(|| from_real_ip(req))
			.or_else(|| peer_ip(req))
	} else {
		peer_ip(req)
	};
	if ip.is_none() {
		warn!("failed to resolve client address for {} {}", req.method(), req.uri());
	}
	// Normalize IPv4-mapped IPv6 so both socket families share one key.
	ip.map(|ip| ip.to_canonical())
}

fn peer_ip<B>(req: &Request<B>) -> Option<IpAddr> {
	req.extensions().get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0.ip())
}

fn from_forwarded_for<B>(req: &Request<B>) -> Option<IpAddr> {
	// X-Forwarded-For may contain a chain: "client, proxy1, proxy2".
	// The leftmost address is the original client.
	req.headers()
		.get("x-forwarded-for")
		.and_then(|h| h.to_str().ok())
		.and_then(|s| s.split(',').next())
		.and_then(|ip| ip.trim().parse().ok())
}

fn from_real_ip<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers()
		.get("x-real-ip")
		.and_then(|h| h.to_str().ok())
		.and_then(|s| s.trim().parse().ok())
}

/// Check for RFC1918 (IPv4) and RFC4193 unique-local (IPv6) ranges.
pub fn is_private(addr: &IpAddr) -> bool {
	match addr {
		IpAddr::V4(ip) => ip.is_private(),
		IpAddr::V6(ip) => (ip.octets()[0] & 0xfe) == 0xfc,
	}
}

/// Addresses the filter never tracks: loopback always, private ranges
/// unless blocking them is enabled.
pub fn is_excluded(addr: &IpAddr, block_private: bool) -> bool {
	if addr.is_loopback() {
		return true;
	}
	!block_private && is_private(addr)
}


// vim: ts=4
