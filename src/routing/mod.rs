//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     map_route(name, template, defaults)
//!     → matcher.rs (parse + validate template)
//!     → router.rs (sort by specificity, freeze as RouteTable)
//!
//! Incoming Request:
//!     path
//!     → RouteTable::resolve (first match wins)
//!     → RouteMatch { controller, action, id, ... } or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use matcher::{RouteTemplate, Segment};
pub use router::{Route, RouteError, RouteMatch, RouteTable, RouteTableBuilder};
