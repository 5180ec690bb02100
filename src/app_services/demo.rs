//! The demo application service behind `api/services/app/demo/{action}`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::data::DbContext;
use crate::error::AppError;
use crate::lifecycle::Environment;
use crate::mvc::{ActionContext, ApplicationService, Handler, Injectable};
use crate::services::{Resolver, ServiceError};

pub struct MyDemoAppService {
    db: Arc<DbContext>,
    environment: Arc<Environment>,
}

impl Injectable for MyDemoAppService {
    fn inject(resolver: &Resolver<'_>) -> Result<Self, ServiceError> {
        Ok(Self {
            db: resolver.get::<DbContext>()?,
            environment: resolver.get::<Environment>()?,
        })
    }
}

impl ApplicationService for MyDemoAppService {}

#[async_trait]
impl Handler for MyDemoAppService {
    async fn invoke(&self, action: &str, ctx: ActionContext) -> Result<Response, AppError> {
        match action.to_ascii_lowercase().as_str() {
            "ping" => Ok(Json(json!({ "message": "pong" })).into_response()),
            "echo" => {
                let query: BTreeMap<&str, &str> = ctx
                    .query_map()
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                Ok(Json(query).into_response())
            }
            "products" => {
                let count = self.db.products().count().await?;
                Ok(Json(json!({ "products": count })).into_response())
            }
            "environment" => Ok(Json(json!({
                "environment": self.environment.name(),
                "requestId": ctx.request_id(),
            }))
            .into_response()),
            _ => Err(AppError::ActionNotFound {
                handler: "MyDemoAppService".to_string(),
                action: action.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_services::tests::provider;
    use crate::mvc::handler::tests::context;
    use axum::body::to_bytes;
    use axum::http::Method;
    use serde_json::Value;

    async fn call(action: &str, uri: &str) -> Result<Value, AppError> {
        let provider = provider().await;
        let scope = provider.create_scope();
        let service = MyDemoAppService::inject(&scope.resolver()).unwrap();
        let response = service.invoke(action, context(Method::GET, uri, "")).await?;
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        Ok(serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_ping() {
        assert_eq!(call("Ping", "/").await.unwrap(), json!({ "message": "pong" }));
    }

    #[tokio::test]
    async fn test_echo_returns_query() {
        let value = call("echo", "/?b=2&a=1").await.unwrap();
        assert_eq!(value, json!({ "a": "1", "b": "2" }));
    }

    #[tokio::test]
    async fn test_products_and_environment() {
        assert_eq!(call("Products", "/").await.unwrap(), json!({ "products": 0 }));
        assert_eq!(call("Environment", "/").await.unwrap()["environment"], "Development");
    }

    #[tokio::test]
    async fn test_unknown_action() {
        assert!(matches!(call("nope", "/").await, Err(AppError::ActionNotFound { .. })));
    }
}
