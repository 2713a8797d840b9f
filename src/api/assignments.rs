//! 作业提交 API
//!
//! 包含 /api/submissions/* 端点；提交作业本身挂在 /api/lessons/:id/submissions

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::extract::ApiJson;
use crate::domain::assignment::GradeRequest;
use crate::domain::Submission;
use crate::error::{ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::services::assignments;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/submissions/me", get(list_mine))
        .route("/api/submissions/:id", get(get_submission))
        .route("/api/submissions/:id/grade", post(grade_submission))
}

/// GET /api/submissions/me
async fn list_mine(auth: AuthUser, State(state): State<Arc<AppState>>) -> ApiResponse<Vec<Submission>> {
    ApiResponse::ok(assignments::list_mine(&state, &auth.user.id).await)
}

/// GET /api/submissions/:id
async fn get_submission(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Submission>> {
    Ok(ApiResponse::ok(assignments::get(&state, &auth.user, &id).await?))
}

/// 评分（讲师/管理员）
///
/// POST /api/submissions/:id/grade
async fn grade_submission(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<GradeRequest>,
) -> ApiResult<ApiResponse<Submission>> {
    let submission = assignments::grade(&state, &auth.user, &id, req).await?;
    Ok(ApiResponse::ok(submission).with_message("Submission graded"))
}
