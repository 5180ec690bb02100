//! Exception handling stages.
//!
//! Failed requests reach these stages as a 500 response carrying an
//! [`ErrorReport`] extension. Each stage decides what the caller sees and
//! removes the report once it has been handled, so an outer stage only sees
//! what inner stages left alone.

use std::any::Any;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::{ErrorKind, ErrorReport};
use crate::http::request::RequestIdExt;
use crate::http::response::{self, RequestSummary};

fn summarize(req: &Request<Body>) -> RequestSummary {
    RequestSummary {
        method: req.method().clone(),
        path: req.uri().path().to_string(),
        request_id: req.request_id().map(str::to_string),
    }
}

/// Development: render every reported error with its full chain.
pub async fn developer_exception_page(req: Request<Body>, next: Next) -> Response {
    let summary = summarize(&req);
    let mut response = next.run(req).await;

    match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => response::developer_exception_page(&report, &summary),
        None => response,
    }
}

/// Development: render database failures with a database-specific page.
/// Other reports pass through untouched.
pub async fn database_error_page(req: Request<Body>, next: Next) -> Response {
    let summary = summarize(&req);
    let mut response = next.run(req).await;

    let is_database = response
        .extensions()
        .get::<ErrorReport>()
        .is_some_and(|r| r.kind == ErrorKind::Database);
    if !is_database {
        return response;
    }
    match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => response::database_error_page(&report, &summary),
        None => response,
    }
}

/// Outside development: redirect reported errors to `error_path`.
///
/// A failure while serving `error_path` itself becomes a plain 500 so the
/// client is not sent into a redirect loop.
pub async fn exception_handler(
    State(error_path): State<Arc<str>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let summary = summarize(&req);
    let mut response = next.run(req).await;

    let Some(report) = response.extensions_mut().remove::<ErrorReport>() else {
        return response;
    };

    tracing::warn!(
        kind = ?report.kind,
        path = %summary.path,
        request_id = summary.request_id.as_deref().unwrap_or("-"),
        "Request failed, redirecting to error handler"
    );

    if summary.path.eq_ignore_ascii_case(&error_path) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    }

    (StatusCode::FOUND, [(header::LOCATION, error_path.to_string())]).into_response()
}

/// Response for a panicking handler, used by the catch-panic stage.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    };
    tracing::error!(panic = %message, "Handler panicked");

    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    response.extensions_mut().insert(ErrorReport::panic(message));
    response
}
