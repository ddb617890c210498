use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::services::get_metrics;
use crate::startup::AppState;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Course generation API",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/health"
    }))
}

/// Liveness probe. Stays 200 in degraded mode; `config_valid` tells the two apart.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "course-service",
        "version": env!("CARGO_PKG_VERSION"),
        "config_valid": state.config.is_ready()
    }))
}

/// Readiness probe: 503 until every required upstream setting is present.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let missing = state.config.missing_required();
    if missing.is_empty() {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "missing": missing })),
        )
    }
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        get_metrics(),
    )
}
