use crate::infra::{AppState, Workflows};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use inspectiq::workflows::workflow_router;
use serde_json::json;

/// Workflow endpoints plus the ops probes.
pub(crate) fn app(workflows: &Workflows, state: AppState) -> Router {
    workflow_router(
        workflows.assignments.clone(),
        workflows.approvals.clone(),
        workflows.review.clone(),
    )
    .route("/health", get(healthcheck))
    .route("/ready", get(readiness_endpoint))
    .route("/metrics", get(metrics_endpoint))
    .layer(Extension(state))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
