//! Deploy endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::ResourceId;
use domain::{AggregateView, Deploy};
use event_store::{Event, EventLog};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateDeployRequest {
    pub specification: Option<String>,
}

#[derive(Deserialize)]
pub struct FailDeployRequest {
    pub reason: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct DeployLinks {
    pub resource: String,
    pub events: String,
}

#[derive(Serialize)]
pub struct DeployResponse<'a> {
    #[serde(flatten)]
    pub deploy: AggregateView<'a, Deploy>,
    pub links: DeployLinks,
}

fn resource_path(id: &ResourceId) -> String {
    format!("/deploys/{id}")
}

// -- Handlers --

/// GET /deploys: list deploys that have not been deleted.
#[tracing::instrument(skip(state))]
pub async fn list<L: EventLog + Clone + 'static>(
    State(state): State<Arc<AppState<L>>>,
) -> Result<Response, ApiError> {
    let deploys = state.deploys.list().await?;

    let body: Vec<DeployResponse<'_>> = deploys
        .iter()
        .map(|deploy| DeployResponse {
            deploy: deploy.view(),
            links: DeployLinks {
                resource: resource_path(deploy.id()),
                events: format!("{}/events", resource_path(deploy.id())),
            },
        })
        .collect();

    Ok(Json(body).into_response())
}

/// POST /deploys: create a deploy from a specification.
#[tracing::instrument(skip(state, body))]
pub async fn create<L: EventLog + Clone + 'static>(
    State(state): State<Arc<AppState<L>>>,
    body: Result<Json<CreateDeployRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let specification = body
        .ok()
        .and_then(|Json(req)| req.specification)
        .filter(|spec| !spec.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Invalid request".to_string()))?;

    let deploy = state.deploys.create(specification).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, resource_path(deploy.id()))],
    )
        .into_response())
}

/// GET /deploys/{id}: load one deploy, including a deleted one.
#[tracing::instrument(skip(state))]
pub async fn get<L: EventLog + Clone + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = ResourceId::from(id);
    let deploy = state
        .deploys
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Deploy {id} not found")))?;

    Ok(Json(deploy.view()).into_response())
}

/// GET /deploys/{id}/events: the deploy's raw event stream.
#[tracing::instrument(skip(state))]
pub async fn events<L: EventLog + Clone + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let id = ResourceId::from(id);
    let events = state
        .deploys
        .events(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Deploy {id} not found")))?;

    Ok(Json(events))
}

/// POST /deploys/{id}/succeed: mark a processing deploy as successful.
#[tracing::instrument(skip(state))]
pub async fn succeed<L: EventLog + Clone + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let deploy = state.deploys.succeed(&ResourceId::from(id)).await?;
    Ok(Json(deploy.view()).into_response())
}

/// POST /deploys/{id}/fail: mark a processing deploy as failed.
#[tracing::instrument(skip(state, body))]
pub async fn fail<L: EventLog + Clone + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Path(id): Path<String>,
    body: Result<Json<FailDeployRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let reason = body
        .ok()
        .and_then(|Json(req)| req.reason)
        .filter(|reason| !reason.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Invalid request".to_string()))?;

    let deploy = state.deploys.fail(&ResourceId::from(id), reason).await?;
    Ok(Json(deploy.view()).into_response())
}

/// DELETE /deploys/{id}: logically delete a deploy.
#[tracing::instrument(skip(state))]
pub async fn delete<L: EventLog + Clone + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.deploys.delete(&ResourceId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
