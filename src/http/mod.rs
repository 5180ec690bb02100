//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, graceful shutdown)
//!     → request.rs (x-request-id generated or kept)
//!     → trace span
//!     → middleware/exception.rs (error page or redirect, per environment)
//!     → static files (wwwroot), falling through to
//!     → mvc dispatch (route → handler → action)
//! ```
//!
//! The stage list is assembled by `pipeline.rs` during Phase 2.

pub mod middleware;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use pipeline::{Application, ApplicationBuilder, Stage};
pub use request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use server::HttpServer;
