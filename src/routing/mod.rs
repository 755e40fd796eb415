//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     path template + RouteOptions
//!     → components.rs (parse, normalize)
//!     → matcher.rs (classify segments, reject duplicate variables)
//!     → router.rs (resolve target, reject duplicates, store static/variable)
//!
//! Incoming Request (path):
//!     → components.rs (parse, decode segments)
//!     → router.rs (static lookup, then variable scan)
//!     → Return: RouteMatch { route, vars } or None
//! ```
//!
//! # Design Decisions
//! - Registry built at startup, immutable while serving
//! - No regex: segments are literals or whole-segment `{name}` variables
//! - Static routes always beat variable routes
//! - First registered variable route wins among variable routes

pub mod components;
pub mod matcher;
pub mod route;
pub mod router;
pub mod sitemap;

pub use components::UriComponents;
pub use route::{ResourceRoots, RouteKind, RouteOptions, RouteTarget, RouteUri, Target};
pub use router::{RegistrationError, RouteMatch, RouteRegistry};
