//! 证书 API
//!
//! 包含 /api/certificates/* 端点

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::extract::ApiJson;
use crate::domain::certificate::IssueCertificateRequest;
use crate::domain::Certificate;
use crate::error::{ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::services::certificates;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/certificates", post(issue))
        .route("/api/certificates/me", get(list_mine))
        .route("/api/certificates/verify/:number", get(verify))
        .route("/api/certificates/:id", get(get_certificate))
}

/// 为已完成的课程签发证书（重复调用返回同一张）
///
/// POST /api/certificates
async fn issue(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<IssueCertificateRequest>,
) -> ApiResult<ApiResponse<Certificate>> {
    let certificate = certificates::issue(&state, &auth.user, &req.course_id).await?;
    Ok(ApiResponse::ok(certificate))
}

/// GET /api/certificates/me
async fn list_mine(auth: AuthUser, State(state): State<Arc<AppState>>) -> ApiResponse<Vec<Certificate>> {
    ApiResponse::ok(certificates::list_mine(&state, &auth.user.id).await)
}

/// 公开验证
///
/// GET /api/certificates/verify/:number
/// 无需认证
async fn verify(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
) -> ApiResult<ApiResponse<Certificate>> {
    let certificate = certificates::verify(&state, &number).await?;
    Ok(ApiResponse::ok(certificate).with_message("Certificate is valid"))
}

/// GET /api/certificates/:id
async fn get_certificate(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Certificate>> {
    Ok(ApiResponse::ok(certificates::get(&state, &auth.user, &id).await?))
}
