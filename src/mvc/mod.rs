//! Handler discovery and action dispatch.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     ApplicationPart[] (explicit lists of HandlerDescriptor)
//!     → FeatureProvider[] (decide which descriptors are handlers, and their names)
//!     → HandlerCatalog (group name → activator), registered as a singleton
//!
//! Per request:
//!     RouteMatch { controller, action }
//!     → HandlerCatalog lookup
//!     → RequestScope → activate handler
//!     → Handler::invoke(action, ActionContext)
//! ```
//!
//! # Design Decisions
//! - No runtime scanning: a part lists its types, providers filter them
//! - Handler names are case-insensitive, like route values
//! - Handlers may be resolved through the service registry
//!   (`add_controllers_as_services`) or constructed directly

pub mod builder;
pub mod catalog;
pub mod dispatch;
pub mod handler;
pub mod parts;

pub use builder::{MvcBuilder, MvcError};
pub use catalog::{CatalogEntry, HandlerCatalog};
pub use dispatch::{dispatch, MvcState};
pub use handler::{ActionContext, ApplicationService, Handler, Injectable};
pub use parts::{
    AppServiceFeatureProvider, ApplicationPart, ApplicationPartManager, ControllerFeatureProvider,
    FeatureProvider, HandlerDescriptor, HandlerKind,
};
