//! Request inspection.
//!
//! # Responsibilities
//! - Expose the request id set by the request-id layer
//! - Rebuild the absolute request URI the router resolves against
//!
//! # Design Decisions
//! - Origin-form targets are made absolute from the `Host` header so host
//!   based features (non-www redirect) see the real host
//! - `X-Forwarded-Proto` only selects the scheme; it never changes the host

use axum::http::{header, Request};

pub const X_REQUEST_ID: &str = "x-request-id";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

pub fn request_id<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
}

/// Absolute URI of the request when the host is known, otherwise the
/// path and query as received.
pub fn request_target<B>(request: &Request<B>) -> String {
    let uri = request.uri();
    if uri.authority().is_some() {
        return uri.to_string();
    }

    let path_and_query = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty());

    match host {
        Some(host) => {
            let scheme = request
                .headers()
                .get(X_FORWARDED_PROTO)
                .and_then(|v| v.to_str().ok())
                .filter(|p| matches!(*p, "http" | "https"))
                .unwrap_or("http");
            format!("{scheme}://{host}{path_and_query}")
        }
        None => path_and_query.to_string(),
    }
}
