use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use axum::response::{Html, IntoResponse, Response};

use crate::error::AppError;
use crate::http::response::escape_html;
use crate::lifecycle::Environment;
use crate::mvc::{ActionContext, Handler, Injectable};
use crate::services::{Resolver, ServiceError};

/// Landing pages.
pub struct HomeController {
    environment: Option<Arc<Environment>>,
}

impl Injectable for HomeController {
    fn inject(resolver: &Resolver<'_>) -> Result<Self, ServiceError> {
        Ok(Self {
            environment: resolver.get::<Environment>().ok(),
        })
    }
}

impl HomeController {
    fn environment_name(&self) -> &str {
        self.environment.as_deref().map(Environment::name).unwrap_or("unknown")
    }
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <link rel=\"stylesheet\" href=\"/css/site.css\">\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    ))
}

#[async_trait]
impl Handler for HomeController {
    async fn invoke(&self, action: &str, ctx: ActionContext) -> Result<Response, AppError> {
        ctx.require_method(action, &[Method::GET, Method::HEAD])?;
        match action.to_ascii_lowercase().as_str() {
            "index" => Ok(page(
                "Home",
                &format!(
                    "<h1>Welcome</h1>\n<p>Environment: {}</p>\n\
                     <p>Try <a href=\"/api/services/app/demo/ping\">/api/services/app/demo/ping</a>.</p>",
                    escape_html(self.environment_name())
                ),
            )
            .into_response()),
            "about" => Ok(page(
                "About",
                "<h1>About</h1>\n<p>Demo host: layered configuration, service registry, \
                 middleware pipeline and conventional routes.</p>",
            )
            .into_response()),
            _ => Err(AppError::ActionNotFound {
                handler: "Home".to_string(),
                action: action.to_string(),
            }),
        }
    }
}
