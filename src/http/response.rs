//! Response conversion.
//!
//! # Responsibilities
//! - Turn a dispatched [`RouterResponse`] into an axum response
//! - Map configuration faults to a generic 500
//!
//! # Design Decisions
//! - Responses without a content type default to HTML
//! - Fault details go to the log, never to the client

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::dispatch::context::RouterResponse;

impl IntoResponse for RouterResponse {
    fn into_response(self) -> Response {
        let (status, headers, body) = self.into_parts();
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
            .headers_mut()
            .entry(header::CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("text/html; charset=UTF-8"));
        response
    }
}

/// Generic 500, JSON for API requests.
pub fn internal_error(api: bool) -> Response {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    if api {
        let body = json!({
            "message": "Internal server error.",
            "type": "error",
            "http-code": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    } else {
        (status, "Internal Server Error").into_response()
    }
}
