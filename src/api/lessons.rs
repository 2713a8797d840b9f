//! 课时 API
//!
//! 包含 /api/lessons/* 端点：内容、完成、测验提交、作业提交

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::api::extract::ApiJson;
use crate::domain::assignment::SubmitAssignmentRequest;
use crate::domain::lesson::UpdateLessonRequest;
use crate::domain::quiz::SubmitQuizRequest;
use crate::domain::{Enrollment, Lesson, Submission};
use crate::error::{ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::services::grading::{self, QuizSubmission};
use crate::services::lessons::{self, LessonResponse};
use crate::services::{assignments, enrollments};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/lessons/:id", get(get_lesson).patch(update_lesson).delete(delete_lesson))
        .route("/api/lessons/:id/complete", post(complete_lesson))
        .route("/api/lessons/:id/quiz/submit", post(submit_quiz))
        .route("/api/lessons/:id/submissions", get(list_submissions).post(submit_assignment))
        .route("/api/lessons/:id/submissions/mine", put(resubmit_assignment))
}

/// 课时内容；学生看到的测验不含答案
///
/// GET /api/lessons/:id
async fn get_lesson(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<LessonResponse>> {
    Ok(ApiResponse::ok(
        lessons::get_for_viewer(&state, &auth.user, &id).await?,
    ))
}

/// PATCH /api/lessons/:id
async fn update_lesson(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateLessonRequest>,
) -> ApiResult<ApiResponse<Lesson>> {
    let lesson = lessons::update(&state, &auth.user, &id, req).await?;
    Ok(ApiResponse::ok(lesson).with_message("Lesson updated"))
}

/// DELETE /api/lessons/:id
async fn delete_lesson(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    lessons::delete(&state, &auth.user, &id).await?;
    Ok(ApiResponse::message("Lesson deleted"))
}

/// 手动完成文本/视频课时
///
/// POST /api/lessons/:id/complete
async fn complete_lesson(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Enrollment>> {
    let enrollment = enrollments::complete_lesson(&state, &auth.user, &id).await?;
    Ok(ApiResponse::ok(enrollment).with_message("Lesson completed"))
}

/// POST /api/lessons/:id/quiz/submit
async fn submit_quiz(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SubmitQuizRequest>,
) -> ApiResult<ApiResponse<QuizSubmission>> {
    let submission = grading::submit_quiz(&state, &auth.user, &id, req).await?;
    let message = if submission.result.passed {
        "Quiz passed"
    } else {
        "Quiz not passed"
    };
    Ok(ApiResponse::ok(submission).with_message(message))
}

/// 作业的全部提交（讲师/管理员）
///
/// GET /api/lessons/:id/submissions
async fn list_submissions(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Vec<Submission>>> {
    Ok(ApiResponse::ok(
        assignments::list_for_lesson(&state, &auth.user, &id).await?,
    ))
}

/// POST /api/lessons/:id/submissions
async fn submit_assignment(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SubmitAssignmentRequest>,
) -> ApiResult<ApiResponse<Submission>> {
    let submission = assignments::submit(&state, &auth.user, &id, req).await?;
    Ok(ApiResponse::created(submission).with_message("Assignment submitted"))
}

/// 修改未评分的提交
///
/// PUT /api/lessons/:id/submissions/mine
async fn resubmit_assignment(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SubmitAssignmentRequest>,
) -> ApiResult<ApiResponse<Submission>> {
    let submission = assignments::resubmit(&state, &auth.user, &id, req).await?;
    Ok(ApiResponse::ok(submission).with_message("Submission updated"))
}
