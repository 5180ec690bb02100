//! Startup orchestration: the application's composition root.
//!
//! # Responsibilities
//! - Phase 1: register every service the application needs and build the
//!   immutable provider
//! - Phase 2: initialize the application context, lay out the middleware
//!   pipeline for the environment and declare the routes
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Errors name the key, file or route at fault

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::app_services;
use crate::config::schema::DEFAULT_CONNECTION;
use crate::config::{AppSettings, ConfigError, Configuration};
use crate::data::{DataError, DbContextFactory};
use crate::http::ApplicationBuilder;
use crate::lifecycle::environment::Environment;
use crate::mvc::{AppServiceFeatureProvider, MvcError};
use crate::observability::{LoggingError, LoggingFacility};
use crate::routing::RouteError;
use crate::services::{ServiceCollection, ServiceError, ServiceProvider};

/// Path failed requests are redirected to outside development.
pub const ERROR_PATH: &str = "/Error";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("required configuration key '{key}' is missing or empty")]
    MissingConfiguration { key: String },

    #[error("connection string '{key}' is invalid: {source}")]
    InvalidConnectionString {
        key: String,
        #[source]
        source: DataError,
    },

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("service registration failed: {0}")]
    Services(#[from] ServiceError),

    #[error("handler discovery failed: {0}")]
    Mvc(#[from] MvcError),

    #[error("invalid route table: {0}")]
    Routing(#[from] RouteError),

    #[error("route '{route}' refers to unknown handler '{handler}'")]
    UnknownHandler { route: String, handler: String },

    #[error("the application context must be initialized before use_mvc")]
    ContextNotInitialized,

    #[error("no routes configured; use_mvc must declare at least one route")]
    RoutingNotConfigured,

    #[error("pipeline stage '{stage}' was added after use_mvc")]
    StageAfterMvc { stage: String },

    #[error("failed to prepare the database: {0}")]
    Database(#[source] DataError),

    #[error("failed to start the metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// The two-phase composition root.
#[derive(Debug)]
pub struct Startup {
    configuration: Arc<Configuration>,
    settings: AppSettings,
    environment: Environment,
}

impl Startup {
    /// Bind typed settings. Configuration must be fully loaded at this point.
    pub fn new(configuration: Configuration, environment: Environment) -> Result<Self, StartupError> {
        let settings = AppSettings::from_configuration(&configuration)?;
        Ok(Self {
            configuration: Arc::new(configuration),
            settings,
            environment,
        })
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Phase 1: service registration.
    ///
    /// Must be called from within a tokio runtime (the connection pool is
    /// created lazily on it).
    pub fn configure_services(&self, mut services: ServiceCollection) -> Result<ServiceProvider, StartupError> {
        let logging_file = self.environment.resolve(&self.settings.logging.config_file);
        let logging = LoggingFacility::from_file(&logging_file)?;
        logging.install()?;
        if logging.source().is_none() {
            tracing::debug!(path = %logging_file.display(), "Logging config not found, using defaults");
        }
        services.add_singleton(Arc::new(logging));

        let key = format!("ConnectionStrings:{DEFAULT_CONNECTION}");
        let connection_string = self
            .configuration
            .connection_string(DEFAULT_CONNECTION)
            .ok_or_else(|| StartupError::MissingConfiguration { key: key.clone() })?;
        let factory = DbContextFactory::new(connection_string, self.settings.database.max_connections)
            .map_err(|source| StartupError::InvalidConnectionString {
                key: key.clone(),
                source,
            })?;
        tracing::info!(
            key = %key,
            source = self.configuration.provenance(&key).unwrap_or("-"),
            "Data-access context registered"
        );
        services.add_db_context(factory);

        services
            .add_mvc()
            .add_application_part(app_services::part())
            .add_feature_provider(AppServiceFeatureProvider)
            .add_controllers_as_services()
            .build()?;

        services.add_singleton(Arc::new(self.settings.clone()));
        services.add_singleton(self.configuration.clone());
        services.add_singleton(Arc::new(self.environment.clone()));

        let provider = services.build()?;
        tracing::info!(
            services = provider.descriptors().len(),
            environment = %self.environment,
            "Services configured"
        );
        Ok(provider)
    }

    /// Phase 2: context, pipeline and routes.
    pub fn configure(&self, app: &mut ApplicationBuilder, env: &Environment) -> Result<(), StartupError> {
        app.use_application_context();

        if env.is_development() {
            app.use_developer_exception_page().use_database_error_page();
        } else {
            app.use_exception_handler(ERROR_PATH);
        }

        app.use_static_files();

        app.use_mvc(|routes| {
            routes
                .map_route("default", "{controller=Home}/{action=Index}/{id?}")
                .map_route_with_defaults(
                    "service-1",
                    "api/services/app/demo/{action}",
                    &[("controller", "MyDemoAppService")],
                );
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationBuilder;
    use crate::http::Stage;
    use crate::lifecycle::environment::{DEVELOPMENT, PRODUCTION};
    use crate::mvc::HandlerCatalog;

    fn startup(entries: &[(&str, &str)], env: &str) -> Startup {
        let configuration = ConfigurationBuilder::new()
            .add_in_memory("test", entries.iter().copied())
            .build()
            .unwrap();
        Startup::new(configuration, Environment::new(env, std::env::temp_dir())).unwrap()
    }

    #[tokio::test]
    async fn test_missing_connection_string() {
        let err = startup(&[], PRODUCTION)
            .configure_services(ServiceCollection::new())
            .unwrap_err();
        assert!(
            matches!(err, StartupError::MissingConfiguration { ref key } if key == "ConnectionStrings:Default")
        );

        let err = startup(&[("ConnectionStrings:Default", "")], PRODUCTION)
            .configure_services(ServiceCollection::new())
            .unwrap_err();
        assert!(matches!(err, StartupError::MissingConfiguration { .. }));
    }

    #[tokio::test]
    async fn test_invalid_connection_string() {
        let err = startup(&[("ConnectionStrings:Default", "sqlite://x.db?mode=bogus")], PRODUCTION)
            .configure_services(ServiceCollection::new())
            .unwrap_err();
        assert!(matches!(err, StartupError::InvalidConnectionString { .. }));
        assert!(err.to_string().contains("ConnectionStrings:Default"));
    }

    #[tokio::test]
    async fn test_phase_one_registrations() {
        let startup = startup(&[("ConnectionStrings:Default", "sqlite::memory:")], PRODUCTION);
        let provider = startup.configure_services(ServiceCollection::new()).unwrap();

        assert!(provider.contains::<DbContextFactory>());
        assert!(provider.contains::<LoggingFacility>());
        assert!(provider.contains::<AppSettings>());
        assert!(provider.contains::<Configuration>());
        assert!(provider.contains::<Environment>());

        let catalog = provider.get::<HandlerCatalog>().unwrap();
        assert!(catalog.handlers_as_services());
        for handler in ["Home", "Error", "MyDemoAppService", "ProductAppService"] {
            assert!(catalog.contains(handler), "{handler} not discovered");
        }
    }

    #[tokio::test]
    async fn test_phase_two_per_environment() {
        for (env, expected) in [
            (DEVELOPMENT, vec![Stage::DeveloperExceptionPage, Stage::DatabaseErrorPage]),
            ("development", vec![Stage::DeveloperExceptionPage, Stage::DatabaseErrorPage]),
            (
                PRODUCTION,
                vec![Stage::ExceptionHandler {
                    path: ERROR_PATH.to_string(),
                }],
            ),
        ] {
            let startup = startup(&[("ConnectionStrings:Default", "sqlite::memory:")], env);
            let provider = Arc::new(startup.configure_services(ServiceCollection::new()).unwrap());
            let mut app = ApplicationBuilder::new(provider, startup.environment().clone());
            startup.configure(&mut app, startup.environment()).unwrap();

            let stages = app.stages();
            assert_eq!(&stages[2..2 + expected.len()], expected.as_slice(), "{env}");
            assert!(matches!(stages[2 + expected.len()], Stage::StaticFiles { .. }));
            assert_eq!(stages.last(), Some(&Stage::Mvc));

            let application = app.build().unwrap();
            let names: Vec<_> = application.routes().routes().iter().map(|r| r.name()).collect();
            assert_eq!(names, vec!["service-1", "default"]);
        }
    }
}
