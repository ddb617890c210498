use axum::{extract::State, Json};
use service_core::error::AppError;
use validator::Validate;

use crate::models::{ApiResponse, GenerateDetailRequest, GenerateOutlineRequest};
use crate::services::WorkflowResult;
use crate::startup::AppState;

#[tracing::instrument(skip(state, request))]
pub async fn generate_outline(
    State(state): State<AppState>,
    Json(request): Json<GenerateOutlineRequest>,
) -> Result<Json<ApiResponse<WorkflowResult>>, AppError> {
    request.validate()?;

    let generated = state
        .dispatcher
        .handle_outline_request(request)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Outline generation failed");
            AppError::from(e)
        })?;

    Ok(Json(ApiResponse::ok(
        "Course outline generated",
        generated.data,
    )))
}

#[tracing::instrument(skip(state, request))]
pub async fn generate_detail(
    State(state): State<AppState>,
    Json(request): Json<GenerateDetailRequest>,
) -> Result<Json<ApiResponse<WorkflowResult>>, AppError> {
    request.validate()?;

    let generated = state
        .dispatcher
        .handle_detail_request(request)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Module detail generation failed");
            AppError::from(e)
        })?;

    Ok(Json(ApiResponse::ok(
        "Module detail generated",
        generated.data,
    )))
}
