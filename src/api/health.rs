//! 健康检查与 API 文档
//!
//! 包含 /health, /api/docs/openapi.json 端点

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::api::openapi;
use crate::config::env::constants::VERSION;
use crate::state::store::StoreCounts;
use crate::state::AppState;

/// 健康检查响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
    uptime_secs: i64,
    persistent: bool,
    counts: StoreCounts,
    live_subscribers: usize,
}

/// 创建健康检查路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/docs/openapi.json", get(openapi_document))
}

/// 健康检查 - 返回状态、版本、运行时间、文档数量
///
/// GET /health
/// 无需认证
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        service: "wikiwalkthrough",
        version: VERSION,
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: state.uptime_secs(),
        persistent: state.config.data_dir.is_some(),
        counts: state.store.counts().await,
        live_subscribers: state.notifications.count().await,
    })
}

/// OpenAPI 文档
///
/// GET /api/docs/openapi.json
async fn openapi_document() -> impl IntoResponse {
    Json(openapi::document())
}
