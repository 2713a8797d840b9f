//! 通知服务

use tracing::info;

use crate::domain::notification::{BroadcastRequest, NotificationQuery};
use crate::domain::{Notification, NotificationKind, Page, PageQuery};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 保存并实时推送通知
pub async fn notify(state: &AppState, notification: Notification) -> ApiResult<Notification> {
    let notification = state.store.notifications.insert(notification).await?;
    let delivered = state.notifications.publish(&notification).await;
    tracing::debug!(
        user_id = %notification.user_id,
        kind = ?notification.kind,
        delivered,
        "Notification sent"
    );
    Ok(notification)
}

/// 我的通知，新的在前
pub async fn list(
    state: &AppState,
    user_id: &str,
    query: &NotificationQuery,
    page: PageQuery,
) -> Page<Notification> {
    let mut items = state
        .store
        .notifications
        .find(|n| n.user_id == user_id && (!query.unread || !n.read))
        .await;
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Page::paginate(items, page)
}

pub async fn unread_count(state: &AppState, user_id: &str) -> usize {
    state
        .store
        .notifications
        .count(|n| n.user_id == user_id && !n.read)
        .await
}

/// 标记已读；不属于当前用户的通知按不存在处理
pub async fn mark_read(state: &AppState, user_id: &str, id: &str) -> ApiResult<Notification> {
    let result = state
        .store
        .notifications
        .try_update(id, |n| {
            if n.user_id != user_id {
                return Err(ApiError::not_found(format!("Notification '{}'", id)));
            }
            n.read = true;
            Ok(())
        })
        .await?;
    result.ok_or_else(|| ApiError::not_found(format!("Notification '{}'", id)))
}

pub async fn mark_all_read(state: &AppState, user_id: &str) -> ApiResult<usize> {
    Ok(state
        .store
        .notifications
        .update_where(|n| n.user_id == user_id && !n.read, |n| n.read = true)
        .await?)
}

pub async fn delete(state: &AppState, user_id: &str, id: &str) -> ApiResult<()> {
    match state.store.notifications.get(id).await {
        Some(n) if n.user_id == user_id => {
            state.store.notifications.remove(id).await?;
            Ok(())
        }
        _ => Err(ApiError::not_found(format!("Notification '{}'", id))),
    }
}

/// 管理员向所有用户广播系统通知，返回发送数量
pub async fn broadcast(state: &AppState, req: BroadcastRequest) -> ApiResult<usize> {
    req.validate()?;
    let users = state.store.users.find(|_| true).await;
    for user in &users {
        let mut n = Notification::new(&user.id, NotificationKind::System, &req.title, &req.message);
        n.link = req.link.clone();
        notify(state, n).await?;
    }
    info!(recipients = users.len(), "System notification broadcast");
    Ok(users.len())
}
