//! Default application part: the controllers every host serves.

pub mod error;
pub mod home;

pub use error::ErrorController;
pub use home::HomeController;

use crate::mvc::{ApplicationPart, HandlerDescriptor};

pub const PART_NAME: &str = "controllers";

pub fn part() -> ApplicationPart {
    ApplicationPart::new(PART_NAME)
        .with(HandlerDescriptor::controller::<HomeController>())
        .with(HandlerDescriptor::controller::<ErrorController>())
}
