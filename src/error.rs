//! Request-time errors.
//!
//! Client errors (4xx) become plain responses. Server errors (5xx) become a
//! bare 500 carrying an [`ErrorReport`] extension; the exception stage of the
//! pipeline decides how much of it the caller gets to see.

use std::collections::BTreeMap;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::data::DataError;
use crate::services::ServiceError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no route matches '{0}'")]
    NoRoute(String),

    #[error("no handler named '{0}'")]
    HandlerNotFound(String),

    #[error("handler '{handler}' has no action '{action}'")]
    ActionNotFound { handler: String, action: String },

    #[error("action '{action}' does not accept {method}")]
    MethodNotAllowed { action: String, method: Method },

    #[error("{0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Database(#[from] DataError),

    #[error("failed to resolve handler dependencies: {0}")]
    Service(#[from] ServiceError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NoRoute(_)
            | AppError::HandlerNotFound(_)
            | AppError::ActionNotFound { .. }
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Service(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Database(_) => ErrorKind::Database,
            AppError::Service(_) => ErrorKind::Service,
            _ => ErrorKind::Internal,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if !status.is_server_error() {
            return (status, self.to_string()).into_response();
        }

        tracing::error!(error = %self, "Request failed");
        let report = ErrorReport::from_error(self.kind(), &self);
        let mut response = (status, "Internal Server Error").into_response();
        response.extensions_mut().insert(report);
        response
    }
}

/// Category of a reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Database,
    Service,
    Internal,
    Panic,
}

/// Details of a failed request, attached to the response as an extension.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    /// `source()` chain below the top-level error.
    pub causes: Vec<String>,
    /// Route values of the matched route, when routing got that far.
    pub route_values: BTreeMap<String, String>,
}

impl ErrorReport {
    pub fn from_error(kind: ErrorKind, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            kind,
            message: error.to_string(),
            causes,
            route_values: BTreeMap::new(),
        }
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Panic,
            message: message.into(),
            causes: Vec::new(),
            route_values: BTreeMap::new(),
        }
    }
}
