//! Dispatch errors.
//!
//! Only configuration faults are errors: the route was registered but what it
//! points at cannot be run. "No route" and "method not allowed" are ordinary
//! responses.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    /// The route's backing file does not exist.
    #[error("route {route} points to missing resource {}", path.display())]
    MissingResource { route: String, path: PathBuf },

    /// The route names an action its controller does not have.
    #[error("controller {controller} has no action {action:?} (route {route})")]
    UnknownAction {
        route: String,
        controller: String,
        action: String,
    },

    /// The backing file exists but could not be read.
    #[error("failed to read resource {} for route {route}: {source}", path.display())]
    Io {
        route: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type RoutingResult<T> = Result<T, RoutingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RoutingError::MissingResource {
            route: "/about".into(),
            path: PathBuf::from("pages/about.html"),
        };
        assert_eq!(err.to_string(), "route /about points to missing resource pages/about.html");

        let err = RoutingError::UnknownAction {
            route: "/users".into(),
            controller: "Users".into(),
            action: "purge".into(),
        };
        assert_eq!(err.to_string(), "controller Users has no action \"purge\" (route /users)");
    }
}
