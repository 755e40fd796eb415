//! URI routing and dispatch engine.
//!
//! Registers path templates (`/blog/{year}/{slug}`) against closures,
//! controllers and file resources, resolves requests to them and runs them
//! through an ordered middleware chain. Also builds XML sitemaps from the
//! registered routes.

pub mod admin;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::RouterConfig;
pub use dispatch::{Dispatcher, RequestContext, RouterResponse, RoutingError};
pub use http::HttpServer;
pub use lifecycle::{Application, Shutdown};
pub use routing::{RegistrationError, RouteOptions, RouteRegistry};
