//! Application services: the handler module registered as an application
//! part in Phase 1.
//!
//! Types here are discovered by `AppServiceFeatureProvider` and routed by
//! their full type name (`/MyDemoAppService/Ping`), or through dedicated
//! routes such as `api/services/app/demo/{action}`.

pub mod demo;
pub mod products;

pub use demo::MyDemoAppService;
pub use products::ProductAppService;

use crate::mvc::{ApplicationPart, HandlerDescriptor};

pub const PART_NAME: &str = "app_services";

pub fn part() -> ApplicationPart {
    ApplicationPart::new(PART_NAME)
        .with(HandlerDescriptor::application_service::<ProductAppService>())
        .with(HandlerDescriptor::application_service::<MyDemoAppService>())
}
