//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext (method, uri, headers)
//!     → dispatcher.rs (www redirect, resolve, 404/405)
//!     → middleware.rs (ordered chain, before hooks)
//!     → target: closure | controller.rs | file resource | sitemap
//!     → middleware.rs (after hooks)
//!     → RouterResponse or RoutingError (configuration faults only)
//! ```
//!
//! # Design Decisions
//! - Bound variables live in the per-request context, never in the registry
//! - 404 and 405 are responses, not errors
//! - Controllers are instantiated fresh for every request

pub mod context;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod middleware;

pub use context::{RequestContext, RouterResponse};
pub use controller::{ActionController, Controller, ControllerRegistry, Page, WebService};
pub use dispatcher::{DispatchSettings, Dispatcher};
pub use error::{RoutingError, RoutingResult};
pub use middleware::{FnMiddleware, Middleware, MiddlewareRegistry, GLOBAL_GROUP};
