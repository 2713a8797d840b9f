//! 报名 API
//!
//! 包含 /api/enrollments/* 端点

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::extract::ApiJson;
use crate::domain::enrollment::EnrollRequest;
use crate::domain::Enrollment;
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::services::enrollments;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/enrollments", post(enroll))
        .route("/api/enrollments/me", get(list_mine))
        .route("/api/enrollments/course/:course_id", get(get_mine).delete(drop_course))
}

/// POST /api/enrollments
async fn enroll(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<EnrollRequest>,
) -> ApiResult<ApiResponse<Enrollment>> {
    let enrollment = enrollments::enroll(&state, &auth.user, &req.course_id).await?;
    Ok(ApiResponse::created(enrollment).with_message("Enrolled"))
}

/// GET /api/enrollments/me
async fn list_mine(auth: AuthUser, State(state): State<Arc<AppState>>) -> ApiResponse<Vec<Enrollment>> {
    ApiResponse::ok(enrollments::list_mine(&state, &auth.user.id).await)
}

/// 当前用户在某课程的报名（含进度）
///
/// GET /api/enrollments/course/:course_id
async fn get_mine(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> ApiResult<ApiResponse<Enrollment>> {
    let enrollment = enrollments::find(&state, &auth.user.id, &course_id)
        .await
        .filter(|e| e.is_current())
        .ok_or_else(|| ApiError::not_found(format!("Enrollment in course '{}'", course_id)))?;
    Ok(ApiResponse::ok(enrollment))
}

/// 退课
///
/// DELETE /api/enrollments/course/:course_id
async fn drop_course(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> ApiResult<ApiResponse<Enrollment>> {
    let enrollment = enrollments::drop_course(&state, &auth.user, &course_id).await?;
    Ok(ApiResponse::ok(enrollment).with_message("Course dropped"))
}
