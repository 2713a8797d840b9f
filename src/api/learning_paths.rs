//! 学习路径 API
//!
//! 包含 /api/learning-paths/* 端点

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::api::extract::ApiJson;
use crate::domain::learning_path::{CreatePathRequest, PathProgress, UpdatePathRequest};
use crate::domain::LearningPath;
use crate::error::{ApiResponse, ApiResult};
use crate::middleware::{AuthUser, OptionalAuthUser};
use crate::services::learning_paths;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/learning-paths", get(list_paths).post(create_path))
        .route("/api/learning-paths/:id", get(get_path).patch(update_path).delete(delete_path))
        .route("/api/learning-paths/:id/progress", get(path_progress))
}

/// GET /api/learning-paths
async fn list_paths(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<Arc<AppState>>,
) -> ApiResponse<Vec<LearningPath>> {
    ApiResponse::ok(learning_paths::list(&state, viewer.as_ref()).await)
}

/// POST /api/learning-paths
async fn create_path(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreatePathRequest>,
) -> ApiResult<ApiResponse<LearningPath>> {
    let path = learning_paths::create(&state, &auth.user, req).await?;
    Ok(ApiResponse::created(path).with_message("Learning path created"))
}

/// GET /api/learning-paths/:id
async fn get_path(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<LearningPath>> {
    Ok(ApiResponse::ok(
        learning_paths::get(&state, viewer.as_ref(), &id).await?,
    ))
}

/// PATCH /api/learning-paths/:id
async fn update_path(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePathRequest>,
) -> ApiResult<ApiResponse<LearningPath>> {
    let path = learning_paths::update(&state, &auth.user, &id, req).await?;
    Ok(ApiResponse::ok(path).with_message("Learning path updated"))
}

/// DELETE /api/learning-paths/:id
async fn delete_path(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    learning_paths::delete(&state, &auth.user, &id).await?;
    Ok(ApiResponse::message("Learning path deleted"))
}

/// 当前用户在路径上的进度
///
/// GET /api/learning-paths/:id/progress
async fn path_progress(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<PathProgress>> {
    Ok(ApiResponse::ok(
        learning_paths::progress(&state, &auth.user, &id).await?,
    ))
}
