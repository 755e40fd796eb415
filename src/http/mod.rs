//! HTTP host subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, request id, trace span, timeout, body limit)
//!     → admin routes, if enabled and matched
//!     → fallback: request.rs (absolute request URI) → Dispatcher
//!     → response.rs (RouterResponse → axum Response, faults → 500)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
