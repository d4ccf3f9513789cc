//! REST gateway - JSON-over-HTTP translation of the export service
//!
//! # Endpoints
//!
//! - `POST /v1/traces` - ingest a JSON [`TraceBatch`]
//! - `POST /v1/metrics` - ingest a JSON [`MetricsBatch`]
//! - `GET /health` - liveness check
//!
//! Responses mirror the RPC acks: a JSON [`ExportResponse`] with the
//! accepted count.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::routing::{get, post};
use conflux_component::{MetricsConsumer, TraceConsumer};
use conflux_telemetry::wire::ExportResponse;
use conflux_telemetry::{MetricsBatch, TraceBatch};
use tower_http::cors::{Any, CorsLayer};

/// Shared state for the REST handlers.
#[derive(Clone)]
pub(crate) struct RestState {
    pub(crate) traces: Option<Arc<dyn TraceConsumer>>,
    pub(crate) metrics: Option<Arc<dyn MetricsConsumer>>,
}

/// Build the gateway router.
///
/// A non-empty allow-list wraps the routes in a CORS filter; an empty list
/// leaves the router bare.
pub(crate) fn router(state: RestState, cors_allowed_origins: &[String]) -> Router {
    let router = Router::new()
        .route("/v1/traces", post(export_traces))
        .route("/v1/metrics", post(export_metrics))
        .route("/health", get(health))
        .with_state(state);

    if cors_allowed_origins.is_empty() {
        return router;
    }

    let mut origins = Vec::new();
    for origin in cors_allowed_origins {
        match origin.parse::<HeaderValue>() {
            Ok(value) => origins.push(value),
            Err(_) => tracing::warn!(%origin, "ignoring unparseable CORS origin"),
        }
    }

    router.layer(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

async fn export_traces(
    State(state): State<RestState>,
    axum::Json(batch): axum::Json<TraceBatch>,
) -> Result<axum::Json<ExportResponse>, (StatusCode, String)> {
    let Some(consumer) = &state.traces else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "no traces pipeline configured".to_string(),
        ));
    };

    let accepted = batch.span_count() as u64;
    consumer
        .consume_traces(Arc::new(batch))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(axum::Json(ExportResponse {
        accepted,
        error: None,
    }))
}

async fn export_metrics(
    State(state): State<RestState>,
    axum::Json(batch): axum::Json<MetricsBatch>,
) -> Result<axum::Json<ExportResponse>, (StatusCode, String)> {
    let Some(consumer) = &state.metrics else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "no metrics pipeline configured".to_string(),
        ));
    };

    let accepted = batch.metric_count() as u64;
    consumer
        .consume_metrics(Arc::new(batch))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(axum::Json(ExportResponse {
        accepted,
        error: None,
    }))
}

async fn health() -> &'static str {
    "ok"
}
