//! Middleware pipeline assembly.
//!
//! # Responsibilities
//! - Record pipeline stages in the order Phase 2 declares them
//! - Compile the route table and check it against the handler catalog
//! - Turn the stage list into one axum `Router`
//!
//! # Design Decisions
//! - The first stage is the outermost layer
//! - Request id and tracing stages are always present, ahead of anything
//!   Phase 2 adds
//! - `use_mvc` is terminal: nothing may follow it
//! - Every check runs before the first request is accepted

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::AppSettings;
use crate::http::middleware::{database_error_page, developer_exception_page, exception_handler, panic_response};
use crate::http::request::{MakeRequestUuid, RequestIdExt};
use crate::lifecycle::{ApplicationContext, Environment, StartupError};
use crate::mvc::{dispatch, HandlerCatalog, MvcState};
use crate::routing::router::CONTROLLER_KEY;
use crate::routing::{RouteTable, RouteTableBuilder};
use crate::services::ServiceProvider;

/// One stage of the request pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    RequestId,
    Trace,
    DeveloperExceptionPage,
    DatabaseErrorPage,
    ExceptionHandler { path: String },
    StaticFiles { root: PathBuf },
    Mvc,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::RequestId => "request-id",
            Stage::Trace => "trace",
            Stage::DeveloperExceptionPage => "developer-exception-page",
            Stage::DatabaseErrorPage => "database-error-page",
            Stage::ExceptionHandler { .. } => "exception-handler",
            Stage::StaticFiles { .. } => "static-files",
            Stage::Mvc => "mvc",
        }
    }
}

/// Phase 2 builder handed to [`Startup::configure`](crate::lifecycle::Startup::configure).
pub struct ApplicationBuilder {
    provider: Arc<ServiceProvider>,
    environment: Environment,
    settings: AppSettings,
    stages: Vec<Stage>,
    context: Option<Arc<ApplicationContext>>,
    routes: Option<Arc<RouteTable>>,
}

impl ApplicationBuilder {
    pub fn new(provider: Arc<ServiceProvider>, environment: Environment) -> Self {
        let settings = provider
            .get_optional::<AppSettings>()
            .ok()
            .flatten()
            .map(|s| AppSettings::clone(&s))
            .unwrap_or_default();
        Self {
            provider,
            environment,
            settings,
            stages: vec![Stage::RequestId, Stage::Trace],
            context: None,
            routes: None,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn provider(&self) -> &Arc<ServiceProvider> {
        &self.provider
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn context(&self) -> Option<&Arc<ApplicationContext>> {
        self.context.as_ref()
    }

    /// Create and initialize the application context. Must precede `use_mvc`.
    pub fn use_application_context(&mut self) -> &mut Self {
        let context = self.context.get_or_insert_with(|| {
            Arc::new(ApplicationContext::new(
                self.provider.clone(),
                self.settings.database.clone(),
            ))
        });
        context.initialize();
        self
    }

    pub fn use_developer_exception_page(&mut self) -> &mut Self {
        self.stages.push(Stage::DeveloperExceptionPage);
        self
    }

    pub fn use_database_error_page(&mut self) -> &mut Self {
        self.stages.push(Stage::DatabaseErrorPage);
        self
    }

    /// Redirect failed requests to `path`.
    pub fn use_exception_handler(&mut self, path: &str) -> &mut Self {
        self.stages.push(Stage::ExceptionHandler {
            path: path.to_string(),
        });
        self
    }

    /// Serve files from the web root under the content root.
    pub fn use_static_files(&mut self) -> &mut Self {
        let root = self.environment.resolve(&self.settings.host.web_root);
        self.stages.push(Stage::StaticFiles { root });
        self
    }

    /// Declare routes and make handler dispatch the terminal stage.
    ///
    /// Fails if the context was not initialized, no route was declared, a
    /// template is invalid, or a route's `controller` default names no
    /// discovered handler.
    pub fn use_mvc<F>(&mut self, configure: F) -> Result<&mut Self, StartupError>
    where
        F: FnOnce(&mut RouteTableBuilder),
    {
        if !self.context.as_ref().is_some_and(|c| c.is_initialized()) {
            return Err(StartupError::ContextNotInitialized);
        }
        let catalog = self.provider.get::<HandlerCatalog>()?;

        let mut builder = RouteTableBuilder::new();
        configure(&mut builder);
        if builder.is_empty() {
            return Err(StartupError::RoutingNotConfigured);
        }
        let table = builder.build()?;

        for route in table.routes() {
            if let Some(handler) = route.default_value(CONTROLLER_KEY) {
                if !catalog.contains(handler) {
                    return Err(StartupError::UnknownHandler {
                        route: route.name().to_string(),
                        handler: handler.to_string(),
                    });
                }
            }
        }

        self.routes = Some(Arc::new(table));
        self.stages.push(Stage::Mvc);
        Ok(self)
    }

    pub fn build(self) -> Result<Application, StartupError> {
        let routes = self.routes.ok_or(StartupError::RoutingNotConfigured)?;
        let context = self.context.ok_or(StartupError::ContextNotInitialized)?;

        if let Some(pos) = self.stages.iter().position(|s| *s == Stage::Mvc) {
            if let Some(after) = self.stages.get(pos + 1) {
                return Err(StartupError::StageAfterMvc {
                    stage: after.name().to_string(),
                });
            }
        }

        let state = MvcState {
            routes: routes.clone(),
            catalog: self.provider.get::<HandlerCatalog>()?,
            provider: self.provider.clone(),
        };

        let mut router = Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(CatchPanicLayer::custom(panic_response));

        for stage in self.stages.iter().rev() {
            router = match stage {
                Stage::Mvc => router,
                Stage::StaticFiles { root } => Router::new().fallback_service(
                    ServeDir::new(root)
                        .append_index_html_on_directories(false)
                        .call_fallback_on_method_not_allowed(true)
                        .fallback(router),
                ),
                Stage::ExceptionHandler { path } => {
                    router.layer(from_fn_with_state(Arc::<str>::from(path.as_str()), exception_handler))
                }
                Stage::DatabaseErrorPage => router.layer(from_fn(database_error_page)),
                Stage::DeveloperExceptionPage => router.layer(from_fn(developer_exception_page)),
                Stage::Trace => router.layer(TraceLayer::new_for_http().make_span_with(request_span)),
                Stage::RequestId => router
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid)),
            };
        }

        let names: Vec<&str> = self.stages.iter().map(Stage::name).collect();
        tracing::info!(
            environment = %self.environment,
            stages = ?names,
            routes = routes.routes().len(),
            "Pipeline built"
        );

        Ok(Application {
            router,
            context,
            routes,
            stages: self.stages,
        })
    }
}

fn request_span(req: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = req.request_id().unwrap_or("-"),
    )
}

/// The assembled application, ready to serve.
pub struct Application {
    router: Router,
    context: Arc<ApplicationContext>,
    routes: Arc<RouteTable>,
    stages: Vec<Stage>,
}

impl Application {
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn context(&self) -> &Arc<ApplicationContext> {
        &self.context
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}
