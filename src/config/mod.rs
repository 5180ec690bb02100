//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! appsettings.json (optional)
//!     → appsettings.<Environment>.json (optional)
//!     → environment variables (SECTION__KEY)
//!     → command-line overrides (in-memory)
//!     → sources.rs (each source yields flat key/value pairs)
//!     → loader.rs (merge in order, later sources win)
//!     → Configuration (immutable, case-insensitive keys)
//!     → schema.rs (typed AppSettings)
//! ```
//!
//! # Design Decisions
//! - Keys are flat, colon-separated paths (`ConnectionStrings:Default`)
//! - Key lookup is case-insensitive; the last writer's casing is kept
//! - Configuration is immutable once built; there is no reload
//! - Malformed files are fatal, missing optional files are skipped

pub mod loader;
pub mod schema;
pub mod sources;

pub use loader::{ConfigError, Configuration, ConfigurationBuilder};
pub use schema::{AppSettings, DatabaseSettings, HostSettings, LoggingSettings, MetricsSettings};
pub use sources::{ConfigurationSource, EnvironmentVariablesSource, JsonFileSource, MemorySource};
