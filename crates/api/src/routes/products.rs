//! Product stock endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use common::ResourceId;
use event_store::EventLog;
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RestockRequest {
    pub amount: u32,
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<L: EventLog + Clone + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = ResourceId::from(id);
    let product = state
        .products
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))?;

    Ok(Json(product.view()).into_response())
}

/// POST /products/{id}/restock: add units to the stock.
#[tracing::instrument(skip(state, body))]
pub async fn restock<L: EventLog + Clone + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Path(id): Path<String>,
    body: Result<Json<RestockRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body.map_err(|_| ApiError::BadRequest("Invalid request".to_string()))?;

    let product = state
        .products
        .restock(&ResourceId::from(id), req.amount)
        .await?;

    Ok(Json(product.view()).into_response())
}

/// POST /products/{id}/buy: reserve one unit.
#[tracing::instrument(skip(state))]
pub async fn buy<L: EventLog + Clone + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let product = state.products.reserve(&ResourceId::from(id)).await?;
    Ok(Json(product.view()).into_response())
}
