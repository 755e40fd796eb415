//! Request spans.
//!
//! Every HTTP request gets one span carrying its method, path and request
//! id; dispatch and registry events logged while serving it nest under it.

use axum::body::Body;
use axum::http::Request;
use tracing::Span;

use crate::http::request::request_id;

/// Span factory for `tower_http::trace::TraceLayer::make_span_with`.
pub fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id(request).unwrap_or("-"),
    )
}
