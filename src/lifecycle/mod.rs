//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Host::build (host.rs):
//!     HostOptions → Environment → layered Configuration
//!     → Startup::configure_services (Phase 1) → ServiceProvider
//!     → Startup::configure (Phase 2) → ApplicationBuilder → Application
//!
//! Host::run:
//!     ApplicationContext::start → serve → Shutdown signal → drain
//!     → ApplicationContext::shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, before the listener accepts
//! - Phase 2 needs the provider that only Phase 1 produces
//! - Framework state lives in an explicit `ApplicationContext`

pub mod context;
pub mod environment;
pub mod host;
pub mod shutdown;
pub mod startup;

pub use context::{ApplicationContext, ContextState};
pub use environment::Environment;
pub use host::{Host, HostOptions};
pub use shutdown::Shutdown;
pub use startup::{Startup, StartupError};
