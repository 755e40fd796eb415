//! Per-request state.
//!
//! Every request gets its own [`RequestContext`]: the bound path variables
//! live here rather than in the registry, so concurrent requests never share
//! them.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use crate::routing::components::UriComponents;

/// Response being assembled by middleware and targets.
#[derive(Debug, Clone)]
pub struct RouterResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    terminated: bool,
}

impl Default for RouterResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            terminated: false,
        }
    }
}

impl RouterResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Set a header; values that are not valid header text are dropped.
    pub fn set_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(_) => tracing::warn!(header = %name, "Dropping invalid header value"),
        }
    }

    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Append to the body.
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) {
        self.body.extend_from_slice(chunk.as_ref());
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, Vec<u8>) {
        (self.status, self.headers, self.body)
    }

    pub fn html(&mut self, status: StatusCode, body: impl Into<Vec<u8>>) {
        self.status = status;
        self.set_header(header::CONTENT_TYPE, "text/html; charset=UTF-8");
        self.set_body(body);
    }

    pub fn json(&mut self, status: StatusCode, value: &serde_json::Value) {
        self.status = status;
        self.set_header(header::CONTENT_TYPE, "application/json");
        self.set_body(value.to_string());
    }

    pub fn xml(&mut self, body: impl Into<Vec<u8>>) {
        self.set_header(header::CONTENT_TYPE, "text/xml");
        self.set_body(body);
    }

    pub fn redirect(&mut self, location: &str, status: StatusCode) {
        self.status = status;
        self.set_header(header::LOCATION, location);
    }

    /// Mark the response as final. Only honored by the dispatcher when
    /// middleware short-circuiting is enabled.
    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// One request on its way through the dispatcher.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    uri: UriComponents,
    headers: HeaderMap,
    body: Bytes,
    route_path: Option<String>,
    vars: HashMap<String, String>,
    api: bool,
    response: RouterResponse,
}

impl RequestContext {
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: UriComponents::parse(uri),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            route_path: None,
            vars: HashMap::new(),
            api: false,
            response: RouterResponse::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &UriComponents {
        &self.uri
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body, already read in full by the host.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Template path of the matched route, once resolved.
    pub fn route_path(&self) -> Option<&str> {
        self.route_path.as_deref()
    }

    /// Value bound to a path variable of the matched route.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }

    /// First query string value for `name`.
    pub fn query_var(&self, name: &str) -> Option<String> {
        self.uri
            .query_vars()
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// True when errors should be reported as JSON.
    pub fn is_api(&self) -> bool {
        self.api
    }

    pub fn set_api(&mut self, api: bool) {
        self.api = api;
    }

    pub fn response(&self) -> &RouterResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut RouterResponse {
        &mut self.response
    }

    pub fn into_response(self) -> RouterResponse {
        self.response
    }

    pub(crate) fn bind(&mut self, route_path: String, vars: HashMap<String, String>, api: bool) {
        self.route_path = Some(route_path);
        self.vars = vars;
        self.api = api;
    }
}
