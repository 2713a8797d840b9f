//! Wikitext 预览 API

use axum::{extract::State, routing::post, Router};
use std::sync::Arc;

use crate::api::extract::ApiJson;
use crate::error::{ApiResponse, ApiResult};
use crate::services::wikitext::{self, PreviewRequest, PreviewResponse};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/wikitext/preview", post(preview))
}

/// 渲染 wikitext 为 HTML
///
/// POST /api/wikitext/preview
/// 无需认证
async fn preview(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<PreviewRequest>,
) -> ApiResult<ApiResponse<PreviewResponse>> {
    Ok(ApiResponse::ok(wikitext::preview(&state, req)?))
}
