//! Handler contracts and the per-invocation action context.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{Method, Uri};
use axum::response::Response;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::routing::RouteMatch;
use crate::services::{Resolver, ServiceError};

/// A group of actions addressed by route values.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Run `action`. Action names are matched case-insensitively by implementors.
    async fn invoke(&self, action: &str, ctx: ActionContext) -> Result<Response, AppError>;
}

/// Marker for application services: handlers recognized by convention rather
/// than by a `Controller` name suffix.
pub trait ApplicationService: Handler {}

/// Construction from the service registry.
pub trait Injectable: Sized + Send + Sync + 'static {
    fn inject(resolver: &Resolver<'_>) -> Result<Self, ServiceError>;
}

/// Everything an action needs from the request.
#[derive(Debug, Clone)]
pub struct ActionContext {
    method: Method,
    uri: Uri,
    route: RouteMatch,
    query: HashMap<String, String>,
    body: Bytes,
    request_id: Option<String>,
}

impl ActionContext {
    pub fn new(
        method: Method,
        uri: Uri,
        route: RouteMatch,
        query: HashMap<String, String>,
        body: Bytes,
        request_id: Option<String>,
    ) -> Self {
        Self {
            method,
            uri,
            route,
            query,
            body,
            request_id,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn route(&self) -> &RouteMatch {
        &self.route
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_map(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        if self.body.is_empty() {
            return Err(AppError::BadRequest("request body is empty".to_string()));
        }
        serde_json::from_slice(&self.body).map_err(|e| AppError::BadRequest(e.to_string()))
    }

    /// A value from the route first, then the query string.
    pub fn param<T>(&self, name: &str) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self
            .route
            .value(name)
            .or_else(|| self.query(name))
            .ok_or_else(|| AppError::BadRequest(format!("missing parameter '{name}'")))?;
        raw.parse::<T>()
            .map_err(|e| AppError::BadRequest(format!("invalid parameter '{name}': {e}")))
    }

    /// Reject the invocation unless it uses one of `allowed`.
    pub fn require_method(&self, action: &str, allowed: &[Method]) -> Result<(), AppError> {
        if allowed.contains(&self.method) {
            Ok(())
        } else {
            Err(AppError::MethodNotAllowed {
                action: action.to_string(),
                method: self.method.clone(),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::routing::RouteTableBuilder;

    pub(crate) fn context(method: Method, path_and_query: &str, body: &str) -> ActionContext {
        let uri: Uri = path_and_query.parse().unwrap();
        let route = RouteTableBuilder::new()
            .map_route("default", "{controller=Home}/{action=Index}/{id?}")
            .build()
            .unwrap()
            .resolve(uri.path())
            .unwrap();
        let query = uri
            .query()
            .map(|q| {
                q.split('&')
                    .filter_map(|pair| pair.split_once('='))
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        ActionContext::new(method, uri, route, query, Bytes::from(body.to_string()), None)
    }

    #[test]
    fn test_param_prefers_route_value() {
        let ctx = context(Method::GET, "/Products/Get/7?id=9&Name=x", "");
        assert_eq!(ctx.param::<i64>("id").unwrap(), 7);
        assert_eq!(ctx.query("name"), Some("x"));
    }

    #[test]
    fn test_param_falls_back_to_query() {
        let ctx = context(Method::GET, "/Products/Get?id=9", "");
        assert_eq!(ctx.param::<i64>("id").unwrap(), 9);
        assert!(matches!(ctx.param::<i64>("missing"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_invalid_param() {
        let ctx = context(Method::GET, "/Products/Get/abc", "");
        assert!(matches!(ctx.param::<i64>("id"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_json_body() {
        #[derive(serde::Deserialize)]
        struct Input {
            name: String,
        }
        let ctx = context(Method::POST, "/Products/Create", r#"{"name":"Widget"}"#);
        assert_eq!(ctx.json::<Input>().unwrap().name, "Widget");

        let empty = context(Method::POST, "/Products/Create", "");
        assert!(empty.json::<Input>().is_err());
    }

    #[test]
    fn test_require_method() {
        let ctx = context(Method::GET, "/Products/Create", "");
        let err = ctx.require_method("Create", &[Method::POST]).unwrap_err();
        assert!(matches!(err, AppError::MethodNotAllowed { .. }));
        assert!(ctx.require_method("Get", &[Method::GET, Method::HEAD]).is_ok());
    }
}
