//! Pipeline middleware written as `axum::middleware::from_fn` functions.

pub mod exception;

pub use exception::{database_error_page, developer_exception_page, exception_handler, panic_response};
