//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → http body limit layer (max_body_size)
//!     → dispatch
//!     → headers.rs (security response headers, `global` group)
//! ```
//!
//! # Design Decisions
//! - Hardening headers enabled by default, switchable in config
//! - Body size capped before the dispatcher ever sees the request

pub mod headers;

pub use headers::{SecurityHeaders, SECURITY_HEADERS};
