//! 用户 API
//!
//! 包含 /api/users/* 端点

use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Router,
};
use std::sync::Arc;

use crate::api::extract::{ApiJson, ApiQuery};
use crate::domain::user::{UpdateProfileRequest, UpdateRoleRequest};
use crate::domain::{Page, PageQuery, PublicUser};
use crate::error::{ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::services::users;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/me", patch(update_me))
        .route("/api/users/:id", get(get_user))
        .route("/api/users/:id/role", patch(update_role))
}

/// 用户列表（管理员）
///
/// GET /api/users?page=&limit=
async fn list_users(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<Page<PublicUser>>> {
    auth.require_admin()?;
    Ok(ApiResponse::ok(users::list(&state, page).await))
}

/// GET /api/users/:id
async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<PublicUser>> {
    Ok(ApiResponse::ok(users::get(&state, &id).await?))
}

/// PATCH /api/users/me
async fn update_me(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let user = users::update_me(&state, &auth.user, req).await?;
    Ok(ApiResponse::ok(user).with_message("Profile updated"))
}

/// 修改角色（管理员）
///
/// PATCH /api/users/:id/role
async fn update_role(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateRoleRequest>,
) -> ApiResult<ApiResponse<PublicUser>> {
    auth.require_admin()?;
    let user = users::set_role(&state, &auth.user, &id, req.role).await?;
    Ok(ApiResponse::ok(user).with_message("Role updated"))
}
