//! Action dispatch: the terminal stage of the pipeline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::body::{to_bytes, Body};
use axum::extract::{Query, State};
use axum::http::request::Parts;
use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::error::{AppError, ErrorReport};
use crate::http::request::X_REQUEST_ID;
use crate::mvc::catalog::{CatalogEntry, HandlerCatalog};
use crate::mvc::handler::ActionContext;
use crate::observability::metrics;
use crate::routing::{RouteMatch, RouteTable};
use crate::services::{RequestScope, ServiceProvider};

/// Largest request body an action will buffer.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state of the dispatch stage.
#[derive(Clone)]
pub struct MvcState {
    pub routes: Arc<RouteTable>,
    pub catalog: Arc<HandlerCatalog>,
    pub provider: Arc<ServiceProvider>,
}

/// Route the request, activate its handler in a fresh request scope, and run
/// the action.
pub async fn dispatch(State(state): State<MvcState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();

    let Some(route) = state.routes.resolve(parts.uri.path()) else {
        return AppError::NoRoute(parts.uri.path().to_string()).into_response();
    };

    let controller = route.controller().unwrap_or_default().to_string();
    let action = route.action().unwrap_or_default().to_string();

    let Some(entry) = state.catalog.get(&controller) else {
        tracing::debug!(controller = %controller, "No handler for route");
        return AppError::HandlerNotFound(controller).into_response();
    };

    let request_id = parts
        .headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    tracing::debug!(
        route = %route.route_name,
        handler = %entry.group(),
        action = %action,
        "Dispatching"
    );

    // The scope outlives the action so scoped services stay valid for the
    // whole invocation.
    let scope = state.provider.create_scope();
    let result = invoke_action(
        &state.catalog,
        entry,
        &scope,
        &action,
        parts,
        route.clone(),
        request_id,
        body,
    )
    .await;

    // Action names come from the path; only recognized ones become labels.
    let recognized = !matches!(result, Err(AppError::ActionNotFound { .. } | AppError::Service(_)));

    let mut response = match result {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };
    if let Some(report) = response.extensions_mut().get_mut::<ErrorReport>() {
        report.route_values = route.values().clone();
    }
    drop(scope);

    metrics::record_request(
        entry.group(),
        recognized.then_some(action.as_str()),
        response.status().as_u16(),
        start,
    );
    response
}

#[allow(clippy::too_many_arguments)]
async fn invoke_action(
    catalog: &HandlerCatalog,
    entry: &CatalogEntry,
    scope: &RequestScope,
    action: &str,
    parts: Parts,
    route: RouteMatch,
    request_id: Option<String>,
    body: Body,
) -> Result<Response, AppError> {
    let handler = catalog.activate(entry, &scope.resolver())?;

    let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map(|Query(q)| q)
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to read body: {e}")))?;

    let ctx = ActionContext::new(parts.method, parts.uri, route, query, body, request_id);
    handler.invoke(action, ctx).await
}
