//! Product catalogue over the request's `DbContext`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::data::{DbContext, NewProduct};
use crate::error::AppError;
use crate::mvc::{ActionContext, ApplicationService, Handler, Injectable};
use crate::services::{Resolver, ServiceError};

pub struct ProductAppService {
    db: Arc<DbContext>,
}

impl Injectable for ProductAppService {
    fn inject(resolver: &Resolver<'_>) -> Result<Self, ServiceError> {
        Ok(Self {
            db: resolver.get::<DbContext>()?,
        })
    }
}

impl ApplicationService for ProductAppService {}

fn validate(product: &NewProduct) -> Result<(), AppError> {
    if product.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }
    if !product.price.is_finite() || product.price < 0.0 {
        return Err(AppError::BadRequest("price must be a non-negative number".to_string()));
    }
    Ok(())
}

#[async_trait]
impl Handler for ProductAppService {
    async fn invoke(&self, action: &str, ctx: ActionContext) -> Result<Response, AppError> {
        match action.to_ascii_lowercase().as_str() {
            "getall" => {
                ctx.require_method(action, &[Method::GET, Method::HEAD])?;
                let products = self.db.products().all().await?;
                Ok(Json(products).into_response())
            }
            "get" => {
                ctx.require_method(action, &[Method::GET, Method::HEAD])?;
                let id = ctx.param::<i64>("id")?;
                match self.db.products().find(id).await? {
                    Some(product) => Ok(Json(product).into_response()),
                    None => Err(AppError::NotFound(format!("product {id} not found"))),
                }
            }
            "create" => {
                ctx.require_method(action, &[Method::POST])?;
                let input: NewProduct = ctx.json()?;
                validate(&input)?;
                let product = self.db.products().insert(&input).await?;
                tracing::info!(id = product.id, name = %product.name, "Product created");
                Ok((StatusCode::CREATED, Json(product)).into_response())
            }
            "count" => {
                let count = self.db.products().count().await?;
                Ok(Json(json!({ "count": count })).into_response())
            }
            _ => Err(AppError::ActionNotFound {
                handler: "ProductAppService".to_string(),
                action: action.to_string(),
            }),
        }
    }
}
