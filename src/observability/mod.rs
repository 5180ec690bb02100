//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     logging.toml → LoggingFacility → process-wide tracing subscriber
//!     Metrics:Enabled → Prometheus exporter on Metrics:Address
//!
//! Per request:
//!     TraceLayer span (carries x-request-id)
//!     → dispatch → metrics::record_request(handler, action, status)
//! ```
//!
//! # Design Decisions
//! - The logging facility is a registered singleton, not a global lookup
//! - A missing logging file means defaults; a malformed one stops startup
//! - `RUST_LOG` wins over the file's filter
//! - Metrics are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;

pub use logging::{LogFormat, LoggingConfig, LoggingError, LoggingFacility};
