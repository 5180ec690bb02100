//! Service registry.
//!
//! # Data Flow
//! ```text
//! Phase 1 (startup):
//!     ServiceCollection (mutable, ordered descriptors)
//!     → build()
//!     → ServiceProvider (immutable, singletons constructed eagerly)
//!
//! Per request:
//!     ServiceProvider::create_scope()
//!     → RequestScope (caches scoped instances until dropped)
//!     → Resolver handed to factories for their dependencies
//! ```
//!
//! # Design Decisions
//! - Capabilities are Rust types (`TypeId`), trait objects included
//! - The set of registrations is fixed once the provider is built
//! - Singletons never depend on scoped services (rejected at resolve time)
//! - Cycles are reported with the full resolution path

pub mod collection;
pub mod error;
pub mod provider;

pub use collection::{Lifetime, ServiceCollection, ServiceDescriptor};
pub use error::ServiceError;
pub use provider::{RequestScope, Resolver, ServiceProvider};
