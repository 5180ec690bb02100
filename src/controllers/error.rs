use async_trait::async_trait;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::http::response::generic_error_page;
use crate::mvc::{ActionContext, Handler, Injectable};
use crate::services::{Resolver, ServiceError};

/// Target of the exception handler redirect. Shows no internal detail.
pub struct ErrorController;

impl Injectable for ErrorController {
    fn inject(_resolver: &Resolver<'_>) -> Result<Self, ServiceError> {
        Ok(Self)
    }
}

#[async_trait]
impl Handler for ErrorController {
    async fn invoke(&self, action: &str, ctx: ActionContext) -> Result<Response, AppError> {
        if action.eq_ignore_ascii_case("index") {
            Ok(generic_error_page(ctx.request_id()).into_response())
        } else {
            Err(AppError::ActionNotFound {
                handler: "Error".to_string(),
                action: action.to_string(),
            })
        }
    }
}
