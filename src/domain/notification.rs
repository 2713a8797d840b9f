//! 站内通知

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::ValidationErrors;

/// 通知类型
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Enrollment,
    Grade,
    Certificate,
    ForumReply,
    System,
}

/// 通知文档
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: &str,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind,
            title: title.into(),
            message: message.into(),
            link: None,
            read: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// 通知列表查询
#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    /// 只看未读
    #[serde(default)]
    pub unread: bool,
}

/// 管理员广播
#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

impl BroadcastRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text(&self.title, "title", 200);
        errors.require_text(&self.message, "message", 2000);
        errors.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_builder() {
        let n = Notification::new("u1", NotificationKind::ForumReply, "New reply", "Someone replied")
            .with_link("/forum/p1");
        assert!(!n.read);
        assert_eq!(n.link.as_deref(), Some("/forum/p1"));
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["kind"], "forum_reply");
        assert_eq!(json["userId"], "u1");
    }
}
