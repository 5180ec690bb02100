//! Data access.
//!
//! # Responsibilities
//! - Parse the "Default" connection string into a pool factory
//! - Hand out one `DbContext` per request scope
//! - Create the schema at host start, close the pool at teardown
//!
//! # Design Decisions
//! - The pool connects lazily; a bad connection string fails at startup,
//!   an unreachable database fails on first use
//! - Queries are runtime-checked (no compile-time database)

pub mod context;
pub mod product;

pub use context::{DataError, DbContext, DbContextFactory};
pub use product::{NewProduct, Product, ProductSet};
