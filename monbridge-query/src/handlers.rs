use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use monbridge_core::{BridgeError, Metric, QueryRequest, Timestamp};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::query_engine::{DatasourceCheck, QueryResponse, DEFAULT_DATASOURCE_ID};
use crate::AppState;

type ApiError = (StatusCode, Json<Value>);

/// Map a bridge error to the HTTP status reported to the front-end
pub fn status_for(err: &BridgeError) -> StatusCode {
    match err.category() {
        "validation" => StatusCode::BAD_REQUEST,
        "upstream" => StatusCode::BAD_GATEWAY,
        "unavailable" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(error: &str, err: &BridgeError) -> ApiError {
    (
        status_for(err),
        Json(json!({
            "error": error,
            "message": err.to_string(),
            "category": err.category()
        })),
    )
}

/// Health check endpoint
pub async fn health_handler() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "monbridge-query",
        "version": monbridge_core::VERSION,
        "timestamp": Timestamp::now().to_rfc3339()
    })))
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    if !state.config.metrics.enable_prometheus {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(state.query_engine.metrics().prometheus_format())
}

/// Main query endpoint
pub async fn query_handler(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    debug!(
        queries = payload.queries.len(),
        datasource_id = ?payload.datasource_id,
        "Received query request"
    );

    match state.query_engine.execute(payload).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            if status_for(&err) == StatusCode::BAD_REQUEST {
                warn!("Query rejected: {}", err);
                Err(api_error("Invalid query", &err))
            } else {
                Err(api_error("Query execution failed", &err))
            }
        }
    }
}

/// Metric catalogue of a measurement
pub async fn measurement_metrics_handler(
    State(state): State<AppState>,
    Path(measurement_obid): Path<i64>,
) -> Result<Json<Vec<Metric>>, ApiError> {
    debug!(measurement_obid, "Received metric catalogue request");

    match state.query_engine.metric_catalogue(measurement_obid).await {
        Ok(metrics) => {
            info!(
                measurement_obid,
                "Returned {} metrics",
                metrics.len()
            );
            Ok(Json(metrics))
        }
        Err(err) => {
            error!("Failed to get metric catalogue: {}", err);
            Err(api_error("Failed to get metrics", &err))
        }
    }
}

/// Data source connectivity check
pub async fn datasource_check_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<DatasourceCheck> {
    let datasource_id = params
        .get("datasourceId")
        .map(String::as_str)
        .unwrap_or(DEFAULT_DATASOURCE_ID);

    let check = state.query_engine.check_datasource(datasource_id).await;
    info!(datasource_id, status = check.status, "Data source check finished");
    Json(check)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&BridgeError::validation("x")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&BridgeError::statistic_link(0, "A", "no id")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&BridgeError::data_fetch(BridgeError::remote(Some(500), "x"))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&BridgeError::server_unavailable("old")),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&BridgeError::Configuration("bad".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
