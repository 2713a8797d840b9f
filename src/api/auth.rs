//! 认证 API
//!
//! 包含 /api/auth/* 端点

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::extract::ApiJson;
use crate::domain::user::{LoginRequest, RegisterRequest};
use crate::domain::PublicUser;
use crate::error::{ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::services::auth::{self, AuthResponse};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

/// 注册（总是学生角色）
///
/// POST /api/auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<ApiResponse<AuthResponse>> {
    let resp = auth::register(&state, req).await?;
    Ok(ApiResponse::created(resp).with_message("Registration successful"))
}

/// 登录
///
/// POST /api/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<ApiResponse<AuthResponse>> {
    let resp = auth::login(&state, req).await?;
    Ok(ApiResponse::ok(resp).with_message("Login successful"))
}

/// 注销当前 token
///
/// POST /api/auth/logout
async fn logout(auth: AuthUser, State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse<()>> {
    auth::logout(&state, &auth.token).await?;
    Ok(ApiResponse::message("Logged out"))
}

/// GET /api/auth/me
async fn me(auth: AuthUser) -> ApiResponse<PublicUser> {
    ApiResponse::ok(auth.user.to_public())
}
