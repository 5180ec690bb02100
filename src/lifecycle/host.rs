//! Host: loads configuration, runs both startup phases and serves.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::{AppSettings, ConfigError, Configuration, ConfigurationBuilder};
use crate::http::{Application, ApplicationBuilder, HttpServer};
use crate::lifecycle::environment::{Environment, ENVIRONMENT_VAR, PRODUCTION};
use crate::lifecycle::startup::{Startup, StartupError};
use crate::observability::metrics;
use crate::services::{ServiceCollection, ServiceProvider};

/// How the host is started.
#[derive(Debug, Clone)]
pub struct HostOptions {
    pub content_root: PathBuf,
    pub environment: String,
    /// Highest-precedence configuration entries (CLI flags, tests).
    pub overrides: Vec<(String, String)>,
}

impl HostOptions {
    /// Environment from `APP_ENVIRONMENT`, defaulting to Production.
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            environment: std::env::var(ENVIRONMENT_VAR)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| PRODUCTION.to_string()),
            overrides: Vec::new(),
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }
}

/// Build the layered configuration set for `environment`:
/// `appsettings.json`, `appsettings.<env>.json`, environment variables,
/// then `overrides`. Later layers win.
pub fn load_configuration(
    environment: &Environment,
    overrides: &[(String, String)],
) -> Result<Configuration, ConfigError> {
    ConfigurationBuilder::new()
        .set_base_path(environment.content_root())
        .add_json_file("appsettings.json", true)
        .add_json_file(format!("appsettings.{}.json", environment.name()), true)
        .add_environment_variables()
        .add_in_memory("overrides", overrides.iter().cloned())
        .build()
}

pub struct Host {
    startup: Startup,
    provider: Arc<ServiceProvider>,
    application: Application,
}

impl Host {
    /// Load configuration and run Phase 1 and Phase 2.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(options: HostOptions) -> Result<Self, StartupError> {
        let environment = Environment::new(options.environment, options.content_root);
        let configuration = load_configuration(&environment, &options.overrides)?;
        tracing::debug!(
            sources = ?configuration.sources(),
            keys = configuration.len(),
            "Configuration loaded"
        );

        let startup = Startup::new(configuration, environment.clone())?;
        let provider = Arc::new(startup.configure_services(ServiceCollection::new())?);

        let mut app = ApplicationBuilder::new(provider.clone(), environment.clone());
        startup.configure(&mut app, &environment)?;
        let application = app.build()?;

        tracing::info!(
            environment = %environment,
            content_root = %environment.content_root().display(),
            "Host built"
        );
        Ok(Self {
            startup,
            provider,
            application,
        })
    }

    pub fn settings(&self) -> &AppSettings {
        self.startup.settings()
    }

    pub fn environment(&self) -> &Environment {
        self.startup.environment()
    }

    pub fn configuration(&self) -> &Configuration {
        self.startup.configuration()
    }

    pub fn provider(&self) -> &Arc<ServiceProvider> {
        &self.provider
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn router(&self) -> Router {
        self.application.router()
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, StartupError> {
        let address = self.settings().host.bind_address;
        TcpListener::bind(address)
            .await
            .map_err(|source| StartupError::Bind { address, source })
    }

    /// Start the context, serve until `shutdown` fires, then tear down.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), StartupError> {
        let context = self.application.context().clone();
        let result = self.serve(listener, shutdown).await;
        context.shutdown().await;
        result
    }

    async fn serve(
        &self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), StartupError> {
        self.application
            .context()
            .start()
            .await
            .map_err(StartupError::Database)?;

        let settings = self.settings();
        if settings.metrics.enabled {
            metrics::init_metrics(settings.metrics.address)?;
        }
        metrics::record_startup(self.environment().name());

        HttpServer::new(self.application.router())
            .run(listener, shutdown)
            .await
            .map_err(StartupError::Serve)
    }
}
