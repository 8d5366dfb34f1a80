//! HTTP API server for the aggregate store.
//!
//! Provides REST endpoints for the Deploy and Product aggregates, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod notifications;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{DeployService, ProductService};
use event_store::EventLog;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L: EventLog + Clone + 'static>(
    state: Arc<AppState<L>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/deploys",
            get(routes::deploys::list::<L>).post(routes::deploys::create::<L>),
        )
        .route(
            "/deploys/{id}",
            get(routes::deploys::get::<L>).delete(routes::deploys::delete::<L>),
        )
        .route("/deploys/{id}/events", get(routes::deploys::events::<L>))
        .route("/deploys/{id}/succeed", post(routes::deploys::succeed::<L>))
        .route("/deploys/{id}/fail", post(routes::deploys::fail::<L>))
        .route("/products/{id}", get(routes::products::get::<L>))
        .route("/products/{id}/restock", post(routes::products::restock::<L>))
        .route("/products/{id}/buy", post(routes::products::buy::<L>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over one event log.
pub fn create_state<L: EventLog + Clone + 'static>(log: L) -> Arc<AppState<L>> {
    Arc::new(AppState {
        deploys: DeployService::new(log.clone()),
        products: ProductService::new(log),
    })
}
