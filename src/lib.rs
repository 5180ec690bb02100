//! Demo web application host library.

pub mod app_services;
pub mod config;
pub mod controllers;
pub mod data;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod mvc;
pub mod observability;
pub mod routing;
pub mod services;

pub use config::{AppSettings, Configuration};
pub use error::AppError;
pub use http::{Application, ApplicationBuilder, HttpServer};
pub use lifecycle::{Host, HostOptions, Shutdown, Startup, StartupError};
