//! Monitoring Bridge Query Service Library
//!
//! This library provides the HTTP side of the bridge: the REST client for the
//! monitoring server, the server validity gate, the query engine driving the
//! core pipeline, and the axum handlers exposing it.

// Core modules
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod query_engine;
pub mod remote_client;
pub mod validity;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// Re-export commonly used types
pub use config::QueryConfig;
pub use query_engine::QueryEngine;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub query_engine: Arc<QueryEngine>,
    pub config: Arc<QueryConfig>,
}

/// Build the service router
pub fn build_router(state: AppState) -> Router {
    use handlers::*;

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/query", post(query_handler))
        .route(
            "/api/v1/measurements/:obid/metrics",
            get(measurement_metrics_handler),
        )
        .route("/api/v1/datasource/check", get(datasource_check_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
