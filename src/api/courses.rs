//! 课程 API
//!
//! 包含 /api/courses/* 端点（含课程下的模块与报名列表）

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::api::extract::{ApiJson, ApiQuery};
use crate::domain::course::{CourseFilter, CreateCourseRequest, UpdateCourseRequest};
use crate::domain::course_module::{CreateModuleRequest, ReorderRequest};
use crate::domain::{Course, CourseModule, Enrollment, Page, PageQuery};
use crate::error::{ApiResponse, ApiResult};
use crate::middleware::{AuthUser, OptionalAuthUser};
use crate::services::courses::{self, CourseDetail};
use crate::services::{enrollments, modules};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/courses", get(list_courses).post(create_course))
        .route("/api/courses/:id", get(get_course).patch(update_course).delete(delete_course))
        .route("/api/courses/:id/publish", post(publish_course))
        .route("/api/courses/:id/unpublish", post(unpublish_course))
        .route("/api/courses/:id/modules", get(list_modules).post(create_module))
        .route("/api/courses/:id/modules/reorder", put(reorder_modules))
        .route("/api/courses/:id/enrollments", get(list_enrollments))
}

/// 课程列表
///
/// GET /api/courses?category=&level=&q=&instructor=&includeUnpublished=&page=&limit=
async fn list_courses(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<CourseFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResponse<Page<Course>> {
    ApiResponse::ok(courses::list(&state, viewer.as_ref(), &filter, page).await)
}

/// POST /api/courses
async fn create_course(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateCourseRequest>,
) -> ApiResult<ApiResponse<Course>> {
    let course = courses::create(&state, &auth.user, req).await?;
    Ok(ApiResponse::created(course).with_message("Course created"))
}

/// 课程详情，未发布课程仅讲师/管理员可见
///
/// GET /api/courses/:id
async fn get_course(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<CourseDetail>> {
    Ok(ApiResponse::ok(courses::detail(&state, viewer.as_ref(), &id).await?))
}

/// PATCH /api/courses/:id
async fn update_course(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateCourseRequest>,
) -> ApiResult<ApiResponse<Course>> {
    let course = courses::update(&state, &auth.user, &id, req).await?;
    Ok(ApiResponse::ok(course).with_message("Course updated"))
}

/// DELETE /api/courses/:id
async fn delete_course(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    courses::delete(&state, &auth.user, &id).await?;
    Ok(ApiResponse::message("Course deleted"))
}

/// POST /api/courses/:id/publish
async fn publish_course(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Course>> {
    let course = courses::set_published(&state, &auth.user, &id, true).await?;
    Ok(ApiResponse::ok(course).with_message("Course published"))
}

/// POST /api/courses/:id/unpublish
async fn unpublish_course(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Course>> {
    let course = courses::set_published(&state, &auth.user, &id, false).await?;
    Ok(ApiResponse::ok(course).with_message("Course unpublished"))
}

/// GET /api/courses/:id/modules
async fn list_modules(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Vec<CourseModule>>> {
    courses::load_visible(&state, viewer.as_ref(), &id).await?;
    Ok(ApiResponse::ok(modules::list_for_course(&state, &id).await))
}

/// POST /api/courses/:id/modules
async fn create_module(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CreateModuleRequest>,
) -> ApiResult<ApiResponse<CourseModule>> {
    let module = modules::create(&state, &auth.user, &id, req).await?;
    Ok(ApiResponse::created(module).with_message("Module created"))
}

/// 按给定 id 顺序重排模块
///
/// PUT /api/courses/:id/modules/reorder
async fn reorder_modules(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ReorderRequest>,
) -> ApiResult<ApiResponse<Vec<CourseModule>>> {
    let list = modules::reorder(&state, &auth.user, &id, req).await?;
    Ok(ApiResponse::ok(list).with_message("Modules reordered"))
}

/// 课程的报名列表（讲师/管理员）
///
/// GET /api/courses/:id/enrollments
async fn list_enrollments(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Vec<Enrollment>>> {
    Ok(ApiResponse::ok(
        enrollments::list_for_course(&state, &auth.user, &id).await?,
    ))
}
