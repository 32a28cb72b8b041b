use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::AppState;
use crate::error::AppError;
use crate::gateway::CheckRateLimitRequest;
use crate::utils::success_to_api_response;

#[axum::debug_handler]
pub async fn check_rate_limit(
    State(state): State<AppState>,
    Json(req): Json<CheckRateLimitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let resp = state.gateway.check_rate_limit(req).await?;
    Ok((StatusCode::OK, success_to_api_response(resp)))
}

#[axum::debug_handler]
pub async fn get_bucket(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state.gateway.bucket_snapshot(&key).await?;
    Ok((StatusCode::OK, success_to_api_response(snapshot)))
}

#[axum::debug_handler]
pub async fn reset_bucket(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.gateway.reset_bucket(&key).await?;
    Ok((StatusCode::OK, success_to_api_response(())))
}

#[axum::debug_handler]
pub async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.gateway.health_check().await?;
    Ok((StatusCode::OK, success_to_api_response("ok")))
}
