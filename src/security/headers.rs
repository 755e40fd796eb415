//! Security response headers.
//!
//! # Responsibilities
//! - Add hardening headers to every dispatched response
//!
//! # Design Decisions
//! - Runs as route middleware in the `global` group, `after` the target
//! - Never overwrites a header the target already set
//! - Runs last (highest priority value) so targets and other middleware win

use axum::http::{header, HeaderName};

use crate::dispatch::context::RequestContext;
use crate::dispatch::middleware::Middleware;

/// Name under which the middleware is registered.
pub const SECURITY_HEADERS: &str = "security-headers";

const DEFAULT_HEADERS: [(HeaderName, &str); 4] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
    (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
    (header::X_XSS_PROTECTION, "0"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct SecurityHeaders;

impl Middleware for SecurityHeaders {
    fn name(&self) -> &str {
        SECURITY_HEADERS
    }

    fn priority(&self) -> i32 {
        i32::MAX
    }

    fn before(&self, _ctx: &mut RequestContext) {}

    fn after(&self, ctx: &mut RequestContext) {
        let response = ctx.response_mut();
        for (name, value) in DEFAULT_HEADERS {
            if !response.headers().contains_key(&name) {
                response.set_header(name, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    #[test]
    fn test_adds_missing_headers_only() {
        let mut ctx = RequestContext::new(Method::GET, "/");
        ctx.response_mut().set_header(header::X_FRAME_OPTIONS, "DENY");

        SecurityHeaders.after(&mut ctx);

        let res = ctx.response();
        assert_eq!(res.header(&header::X_CONTENT_TYPE_OPTIONS), Some("nosniff"));
        assert_eq!(res.header(&header::X_FRAME_OPTIONS), Some("DENY"));
        assert_eq!(res.header(&header::REFERRER_POLICY), Some("strict-origin-when-cross-origin"));
    }
}
