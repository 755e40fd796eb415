//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, route collisions)
//!     → RouterConfig (validated, immutable)
//!     → lifecycle::startup builds the Dispatcher from it
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → http::server builds a new Dispatcher and swaps it atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, ConfiguredKind, ListenerConfig, ObservabilityConfig, RouteConfig, RouterConfig,
    RoutingConfig, SecurityConfig,
};
pub use validation::{validate_config, ValidationError};
