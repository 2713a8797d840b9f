//! 通知 API
//!
//! 包含 /api/notifications/* 端点，以及基于 SSE 的实时推送

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, patch, post},
    Router,
};
use futures::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::api::extract::{ApiJson, ApiQuery};
use crate::domain::notification::{BroadcastRequest, NotificationQuery};
use crate::domain::{Notification, Page, PageQuery};
use crate::error::{ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::services::notifications;
use crate::state::{get_shutdown_token, AppState};

/// SSE keep-alive 间隔（秒）
const KEEPALIVE_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Serialize)]
struct UnreadCount {
    unread: usize,
}

#[derive(Debug, Serialize)]
struct UpdatedCount {
    updated: usize,
}

#[derive(Debug, Serialize)]
struct Recipients {
    recipients: usize,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/stream", get(stream_notifications))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/notifications/broadcast", post(broadcast_notification))
        .route("/api/notifications/:id/read", patch(mark_read))
        .route("/api/notifications/:id", delete(delete_notification))
}

/// 我的通知
///
/// GET /api/notifications?unread=true&page=&limit=
async fn list_notifications(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<NotificationQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResponse<Page<Notification>> {
    ApiResponse::ok(notifications::list(&state, &auth.user.id, &query, page).await)
}

/// GET /api/notifications/unread-count
async fn unread_count(auth: AuthUser, State(state): State<Arc<AppState>>) -> ApiResponse<UnreadCount> {
    let unread = notifications::unread_count(&state, &auth.user.id).await;
    ApiResponse::ok(UnreadCount { unread })
}

/// 实时通知流
///
/// GET /api/notifications/stream
/// 每条新通知作为一个 `notification` 事件推送
async fn stream_notifications(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user_id = auth.user.id.clone();
    let mut rx = state.notifications.subscribe(&user_id).await;
    let shutdown = get_shutdown_token();
    debug!(user_id = %user_id, "Notification stream opened");

    let stream = async_stream::stream! {
        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = rx.recv() => received,
            };
            match received {
                Ok(notification) => {
                    let json = serde_json::to_string(&notification).unwrap_or_default();
                    yield Ok(Event::default().event("notification").id(notification.id.clone()).data(json));
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(user_id = %user_id, lagged = n, "Notification subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!(user_id = %user_id, "Notification stream closed");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(KEEPALIVE_INTERVAL_SECS))
            .text("keepalive"),
    )
}

/// POST /api/notifications/read-all
async fn mark_all_read(auth: AuthUser, State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse<UpdatedCount>> {
    let updated = notifications::mark_all_read(&state, &auth.user.id).await?;
    Ok(ApiResponse::ok(UpdatedCount { updated }))
}

/// 广播系统通知（管理员）
///
/// POST /api/notifications/broadcast
async fn broadcast_notification(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<BroadcastRequest>,
) -> ApiResult<ApiResponse<Recipients>> {
    auth.require_admin()?;
    let recipients = notifications::broadcast(&state, req).await?;
    Ok(ApiResponse::ok(Recipients { recipients }).with_message("Notification broadcast"))
}

/// PATCH /api/notifications/:id/read
async fn mark_read(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Notification>> {
    Ok(ApiResponse::ok(
        notifications::mark_read(&state, &auth.user.id, &id).await?,
    ))
}

/// DELETE /api/notifications/:id
async fn delete_notification(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    notifications::delete(&state, &auth.user.id, &id).await?;
    Ok(ApiResponse::message("Notification deleted"))
}
