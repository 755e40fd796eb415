//! URI parsing.
//!
//! # Responsibilities
//! - Split a URI into scheme, host, port, path segments, query and fragment
//! - Normalize the path (no empty segments, no trailing slash, leading `/`)
//! - Never fail: malformed input degrades to an empty path
//!
//! # Design Decisions
//! - Absolute URIs go through `url::Url`; relative paths are joined onto a
//!   placeholder base so both take the same code path
//! - Segments are kept in their percent-encoded form (canonical, idempotent)
//!   and in decoded form (used for matching and variable binding)

use std::borrow::Cow;
use std::fmt;

use url::Url;

const PLACEHOLDER_BASE: &str = "http://localhost/";

/// Parsed form of a single URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriComponents {
    scheme: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    raw_segments: Vec<String>,
    segments: Vec<String>,
    query: Option<String>,
    fragment: Option<String>,
}

impl UriComponents {
    /// Parse a URI or a bare path.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        let (url, absolute) = match Url::parse(trimmed) {
            Ok(url) => (url, true),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                // Collapse leading slashes so `//x/y` is a path, not an authority.
                let relative = format!("/{}", trimmed.trim_start_matches(['/', '\\']));
                match Url::parse(PLACEHOLDER_BASE).and_then(|base| base.join(&relative)) {
                    Ok(url) => (url, false),
                    Err(e) => {
                        tracing::debug!(uri = %trimmed, error = %e, "Unparsable relative URI");
                        return Self::default();
                    }
                }
            }
            Err(e) => {
                tracing::debug!(uri = %trimmed, error = %e, "Unparsable URI");
                return Self::default();
            }
        };

        let raw_segments: Vec<String> = url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let segments = raw_segments.iter().map(|s| decode(s).into_owned()).collect();

        Self {
            scheme: absolute.then(|| url.scheme().to_string()),
            host: if absolute { url.host_str().map(str::to_string) } else { None },
            port: if absolute { url.port() } else { None },
            raw_segments,
            segments,
            query: url.query().map(str::to_string),
            fragment: url.fragment().map(str::to_string),
        }
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// True when the input carried its own scheme and authority.
    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some()
    }

    /// Decoded path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Percent-encoded path segments.
    pub fn raw_segments(&self) -> &[String] {
        &self.raw_segments
    }

    /// Canonical, percent-encoded path. Always starts with `/`.
    pub fn path(&self) -> String {
        join_path(&self.raw_segments)
    }

    /// Decoded path, as used for route keys and diagnostics.
    pub fn display_path(&self) -> String {
        join_path(&self.segments)
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Decoded `key=value` pairs of the query string, in order.
    pub fn query_vars(&self) -> Vec<(String, String)> {
        self.query
            .as_deref()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// True if the host starts with `www`.
    pub fn has_www(&self) -> bool {
        self.host
            .as_deref()
            .map(|h| h.to_ascii_lowercase().starts_with("www."))
            .unwrap_or(false)
    }

    /// The same URI on the bare host, if the host starts with `www.`.
    pub fn without_www(&self) -> Option<String> {
        if !self.has_www() {
            return None;
        }
        let mut bare = self.clone();
        bare.host = self.host.as_deref().map(|h| h[4..].to_string());
        Some(bare.to_uri_string(true, true))
    }

    /// Rebuild the URI string, optionally with query and fragment.
    pub fn to_uri_string(&self, include_query: bool, include_fragment: bool) -> String {
        let mut out = String::new();
        if let (Some(scheme), Some(host)) = (&self.scheme, &self.host) {
            out.push_str(scheme);
            out.push_str("://");
            out.push_str(host);
            if let Some(port) = self.port {
                out.push(':');
                out.push_str(&port.to_string());
            }
        }
        out.push_str(&self.path());
        if include_query {
            if let Some(q) = &self.query {
                out.push('?');
                out.push_str(q);
            }
        }
        if include_fragment {
            if let Some(f) = &self.fragment {
                out.push('#');
                out.push_str(f);
            }
        }
        out
    }
}

impl fmt::Display for UriComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri_string(true, true))
    }
}

/// Normalize a path the way route registration and resolution do.
///
/// `normalize_path(normalize_path(p)) == normalize_path(p)` for every `p`.
pub fn normalize_path(input: &str) -> String {
    UriComponents::parse(input).path()
}

pub(crate) fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    segments.iter().fold(String::new(), |mut acc, s| {
        acc.push('/');
        acc.push_str(s.as_ref());
        acc
    })
}

fn decode(segment: &str) -> Cow<'_, str> {
    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_and_missing_leading_slash() {
        assert_eq!(normalize_path("/a/b/"), "/a/b");
        assert_eq!(normalize_path("a/b"), "/a/b");
        assert_eq!(normalize_path("/a/b"), "/a/b");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for p in ["/a//b/", "x/y/z/", "/users/{id}", "/caf%C3%A9/", "/a%2520b", "//double"] {
            let once = normalize_path(p);
            assert_eq!(normalize_path(&once), once, "input {p}");
        }
    }

    #[test]
    fn test_absolute_uri() {
        let uri = UriComponents::parse("https://www.example.com:8443/blog/post/?lang=en&x=1#top");
        assert_eq!(uri.scheme(), Some("https"));
        assert_eq!(uri.host(), Some("www.example.com"));
        assert_eq!(uri.port(), Some(8443));
        assert_eq!(uri.segments(), ["blog", "post"]);
        assert_eq!(uri.query(), Some("lang=en&x=1"));
        assert_eq!(uri.fragment(), Some("top"));
        assert_eq!(
            uri.query_vars(),
            vec![("lang".to_string(), "en".to_string()), ("x".to_string(), "1".to_string())]
        );
        assert!(uri.has_www());
        assert_eq!(
            uri.without_www().as_deref(),
            Some("https://example.com:8443/blog/post?lang=en&x=1#top")
        );
    }

    #[test]
    fn test_relative_path_has_no_authority() {
        let uri = UriComponents::parse("/shop/items?page=2");
        assert!(!uri.is_absolute());
        assert_eq!(uri.host(), None);
        assert_eq!(uri.display_path(), "/shop/items");
        assert_eq!(uri.query(), Some("page=2"));
        assert!(uri.without_www().is_none());
    }

    #[test]
    fn test_segments_are_decoded() {
        let uri = UriComponents::parse("/users/{id}/hello%20world");
        assert_eq!(uri.segments(), ["users", "{id}", "hello world"]);
        assert_eq!(uri.display_path(), "/users/{id}/hello world");
    }

    #[test]
    fn test_malformed_uri_degrades_to_empty_path() {
        let uri = UriComponents::parse("http://[::1");
        assert!(uri.segments().is_empty());
        assert_eq!(uri.path(), "/");
    }
}
