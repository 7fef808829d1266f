//! Punitive responses for blocked clients.
//!
//! A blocked request is never forwarded. Depending on configuration the
//! client either gets an immediate plain rejection, or is made to wait and
//! then served one of several decoy responses, picked in rotation from a
//! random starting point until one applies.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use rand::RngExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::ScanFilter;

/// Per-connection takeover handle.
///
/// The accept loop inserts one into the extensions of every request and
/// tears the underlying connection down when it is cancelled. This is the
/// capability the connection-close decoy needs; without it that strategy
/// is skipped.
#[derive(Clone, Debug)]
pub struct ConnGuard(CancellationToken);

impl ConnGuard {
	pub fn new(token: CancellationToken) -> Self {
		Self(token)
	}

	/// Tear down the connection this request arrived on.
	pub fn abort(&self) {
		self.0.cancel();
	}

	/// Completes when the connection is going away.
	pub async fn closed(&self) {
		self.0.cancelled().await;
	}
}

const WAIT_MIN: Duration = Duration::from_secs(10);
const WAIT_MAX: Duration = Duration::from_secs(25);

/// The 4xx pool used for decoy responses.
const DECOY_STATUS_CODES: &[StatusCode] = &[
	StatusCode::BAD_REQUEST,
	StatusCode::UNAUTHORIZED,
	StatusCode::PAYMENT_REQUIRED,
	StatusCode::FORBIDDEN,
	StatusCode::NOT_FOUND,
	StatusCode::METHOD_NOT_ALLOWED,
	StatusCode::NOT_ACCEPTABLE,
	StatusCode::PROXY_AUTHENTICATION_REQUIRED,
	StatusCode::REQUEST_TIMEOUT,
	StatusCode::CONFLICT,
	StatusCode::GONE,
	StatusCode::LENGTH_REQUIRED,
	StatusCode::PRECONDITION_FAILED,
	StatusCode::PAYLOAD_TOO_LARGE,
	StatusCode::URI_TOO_LONG,
	StatusCode::UNSUPPORTED_MEDIA_TYPE,
	StatusCode::RANGE_NOT_SATISFIABLE,
	StatusCode::EXPECTATION_FAILED,
	StatusCode::IM_A_TEAPOT,
	StatusCode::MISDIRECTED_REQUEST,
	StatusCode::UNPROCESSABLE_ENTITY,
	StatusCode::LOCKED,
	StatusCode::FAILED_DEPENDENCY,
	StatusCode::TOO_EARLY,
	StatusCode::UPGRADE_REQUIRED,
	StatusCode::PRECONDITION_REQUIRED,
	StatusCode::TOO_MANY_REQUESTS,
	StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
	StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS,
];

fn random_4xx() -> StatusCode {
	DECOY_STATUS_CODES[rand::rng().random_range(0..DECOY_STATUS_CODES.len())]
}

fn random_wait() -> Duration {
	let spread = (WAIT_MAX - WAIT_MIN).as_millis() as u64;
	WAIT_MIN + Duration::from_millis(rand::rng().random_range(0..spread))
}

/// A decoy strategy: returns the response it produced, or `None` when it
/// does not apply here so the next one in rotation gets a turn.
type Strategy = fn(Option<&ConnGuard>) -> Option<Response<Body>>;

const STRATEGIES: &[Strategy] = &[close_connection, plain_4xx, emoji_4xx, message_4xx];

fn close_connection(guard: Option<&ConnGuard>) -> Option<Response<Body>> {
	let guard = guard?;
	guard.abort();
	// The connection is torn down by the accept loop; this response is
	// never delivered.
	Some(Response::new(Body::empty()))
}

fn plain_4xx(_guard: Option<&ConnGuard>) -> Option<Response<Body>> {
	Some(random_4xx().into_response())
}

fn emoji_4xx(_guard: Option<&ConnGuard>) -> Option<Response<Body>> {
	Some((random_4xx(), "\u{1f61b}\n").into_response())
}

fn message_4xx(_guard: Option<&ConnGuard>) -> Option<Response<Body>> {
	Some((random_4xx(), "Let's play a game.\n").into_response())
}

/// Produce the response for a blocked request.
///
/// Piggy-backs an eviction sweep on the block path (the sweep cooldown keeps
/// this cheap), then either rejects plainly or plays a decoy. The decoy wait
/// gives up early when the connection goes away, so a client hanging up does
/// not keep resources pinned for the full delay.
pub async fn respond<B>(filter: &ScanFilter, req: &Request<B>) -> Response<Body> {
	let removed = filter.store().sweep(filter.config().remember_duration());
	if removed > 0 {
		info!("purged {} stale client entries", removed);
	}

	if !filter.config().play_decoys {
		return (StatusCode::TOO_MANY_REQUESTS, "blocked by scanward\n").into_response();
	}

	let guard = req.extensions().get::<ConnGuard>();

	// Always wait a little.
	let wait = random_wait();
	if let Some(guard) = guard {
		tokio::select! {
			() = guard.closed() => {
				debug!("client went away during decoy wait");
				return Response::new(Body::empty());
			}
			() = tokio::time::sleep(wait) => {}
		}
	} else {
		tokio::time::sleep(wait).await;
	}

	// Try strategies in rotation from a random offset until one applies.
	// Only the connection close can fail, so this terminates within one
	// round.
	let mut idx = rand::rng().random_range(0..STRATEGIES.len());
	loop {
		if let Some(response) = STRATEGIES[idx](guard) {
			return response;
		}
		idx = (idx + 1) % STRATEGIES.len();
	}
}


// vim: ts=4
