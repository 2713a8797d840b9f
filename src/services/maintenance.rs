//! 后台维护任务
//!
//! 定期清理过期会话和无人订阅的通知通道，收到全局 shutdown 后退出

use std::sync::Arc;
use std::time::Duration;

use crate::config::env::constants::SESSION_CLEANUP_INTERVAL_SECS;
use crate::services::auth;
use crate::state::{get_shutdown_token, AppState};

/// 启动维护循环
pub async fn start(state: Arc<AppState>) {
    let shutdown = get_shutdown_token();
    let mut interval = tokio::time::interval(Duration::from_secs(SESSION_CLEANUP_INTERVAL_SECS));

    tracing::info!(
        interval_secs = SESSION_CLEANUP_INTERVAL_SECS,
        "Starting maintenance task"
    );

    // 首次 tick 立即返回，跳过
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Maintenance task stopped");
                break;
            }
            _ = interval.tick() => {
                run_once(&state).await;
            }
        }
    }
}

/// 执行一轮清理
pub async fn run_once(state: &AppState) {
    match auth::purge_expired_sessions(state).await {
        Ok(0) => {}
        Ok(n) => tracing::info!(sessions = n, "Purged expired sessions"),
        Err(e) => tracing::warn!(error = %e, "Failed to purge sessions"),
    }

    let channels = state.notifications.cleanup().await;
    if channels > 0 {
        tracing::debug!(channels, "Removed idle notification channels");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Session;
    use chrono::{Duration as ChronoDuration, Utc};

    #[tokio::test]
    async fn test_run_once_purges_expired_sessions() {
        let state = AppState::in_memory();
        let now = Utc::now();
        for (token, offset) in [("old", -1), ("fresh", 1)] {
            state
                .store
                .sessions
                .insert(Session {
                    token: token.into(),
                    user_id: "u1".into(),
                    created_at: now,
                    expires_at: now + ChronoDuration::hours(offset),
                })
                .await
                .unwrap();
        }
        drop(state.notifications.subscribe("u1").await);

        run_once(&state).await;

        assert_eq!(state.store.sessions.len().await, 1);
        assert!(state.store.sessions.get("fresh").await.is_some());
        assert_eq!(state.notifications.count().await, 0);
    }
}
