//! 模块 API
//!
//! 包含 /api/modules/* 端点

use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Router,
};
use std::sync::Arc;

use crate::api::extract::ApiJson;
use crate::domain::course_module::UpdateModuleRequest;
use crate::domain::lesson::CreateLessonRequest;
use crate::domain::{CourseModule, Lesson};
use crate::error::{ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::services::lessons::{self, LessonResponse};
use crate::services::modules;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/modules/:id", patch(update_module).delete(delete_module))
        .route("/api/modules/:id/lessons", get(list_lessons).post(create_lesson))
}

/// PATCH /api/modules/:id
async fn update_module(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateModuleRequest>,
) -> ApiResult<ApiResponse<CourseModule>> {
    let module = modules::update(&state, &auth.user, &id, req).await?;
    Ok(ApiResponse::ok(module).with_message("Module updated"))
}

/// DELETE /api/modules/:id
async fn delete_module(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    modules::delete(&state, &auth.user, &id).await?;
    Ok(ApiResponse::message("Module deleted"))
}

/// GET /api/modules/:id/lessons
async fn list_lessons(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Vec<LessonResponse>>> {
    Ok(ApiResponse::ok(
        lessons::list_for_module_viewer(&state, &auth.user, &id).await?,
    ))
}

/// POST /api/modules/:id/lessons
async fn create_lesson(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CreateLessonRequest>,
) -> ApiResult<ApiResponse<Lesson>> {
    let lesson = lessons::create(&state, &auth.user, &id, req).await?;
    Ok(ApiResponse::created(lesson).with_message("Lesson created"))
}
