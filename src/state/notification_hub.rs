//! 通知推送通道管理
//!
//! 每个用户一个广播通道，SSE 订阅者通过它实时收到新通知；
//! 没有订阅者的通道会被定期清理

use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use crate::domain::Notification;

/// 通道容量
const CHANNEL_CAPACITY: usize = 64;

/// 通知中心
pub struct NotificationHub {
    /// user_id -> 通道
    channels: RwLock<HashMap<String, broadcast::Sender<Notification>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// 订阅某用户的通知，通道不存在时创建
    pub async fn subscribe(&self, user_id: &str) -> broadcast::Receiver<Notification> {
        let mut channels = self.channels.write().await;
        channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// 推送通知，返回收到的订阅者数量
    ///
    /// 用户不在线时直接丢弃（通知已持久化，下次拉取可见）
    pub async fn publish(&self, notification: &Notification) -> usize {
        let channels = self.channels.read().await;
        channels
            .get(&notification.user_id)
            .and_then(|sender| sender.send(notification.clone()).ok())
            .unwrap_or(0)
    }

    /// 清理没有订阅者的通道
    pub async fn cleanup(&self) -> usize {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }

    pub async fn count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NotificationKind;

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let hub = NotificationHub::new();
        let mut rx = hub.subscribe("u1").await;

        let n = Notification::new("u1", NotificationKind::System, "Hello", "Welcome");
        assert_eq!(hub.publish(&n).await, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.title, "Hello");
    }

    #[tokio::test]
    async fn test_publish_without_subscriber() {
        let hub = NotificationHub::new();
        let n = Notification::new("u2", NotificationKind::System, "Hi", "Nobody listening");
        assert_eq!(hub.publish(&n).await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_removes_idle_channels() {
        let hub = NotificationHub::new();
        let rx = hub.subscribe("u1").await;
        let _kept = hub.subscribe("u2").await;
        drop(rx);

        assert_eq!(hub.cleanup().await, 1);
        assert_eq!(hub.count().await, 1);
    }
}
