//! 论坛帖子与评论

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::ValidationErrors;
use crate::config::env::constants::MAX_TITLE_LEN;

/// 评论
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// 帖子文档（评论内嵌）
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    pub id: String,
    #[serde(default)]
    pub course_id: Option<String>,
    pub author_id: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub upvotes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ForumPost {
    /// 切换点赞，返回切换后是否已点赞
    pub fn toggle_upvote(&mut self, user_id: &str) -> bool {
        if let Some(pos) = self.upvotes.iter().position(|u| u == user_id) {
            self.upvotes.remove(pos);
            false
        } else {
            self.upvotes.push(user_id.to_string());
            true
        }
    }
}

/// 帖子列表中的摘要（不含评论正文）
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPostSummary {
    pub id: String,
    pub course_id: Option<String>,
    pub author_id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub pinned: bool,
    pub locked: bool,
    pub upvote_count: usize,
    pub comment_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&ForumPost> for ForumPostSummary {
    fn from(p: &ForumPost) -> Self {
        Self {
            id: p.id.clone(),
            course_id: p.course_id.clone(),
            author_id: p.author_id.clone(),
            title: p.title.clone(),
            tags: p.tags.clone(),
            pinned: p.pinned,
            locked: p.locked,
            upvote_count: p.upvotes.len(),
            comment_count: p.comments.len(),
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub course_id: Option<String>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text(&self.title, "title", MAX_TITLE_LEN);
        errors.require_text(&self.body, "body", 50_000);
        errors.finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl UpdatePostRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = &self.title {
            errors.require_text(title, "title", MAX_TITLE_LEN);
        }
        if let Some(body) = &self.body {
            errors.require_text(body, "body", 50_000);
        }
        errors.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub body: String,
}

impl CommentRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text(&self.body, "body", 10_000);
        errors.finish()
    }
}

/// 置顶 / 锁帖
#[derive(Debug, Default, Deserialize)]
pub struct ModerateRequest {
    pub pinned: Option<bool>,
    pub locked: Option<bool>,
}

/// 帖子列表过滤
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFilter {
    pub course_id: Option<String>,
    pub tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_upvote() {
        let now = Utc::now();
        let mut post = ForumPost {
            id: "p1".into(),
            course_id: None,
            author_id: "u1".into(),
            title: "How do I cite a book?".into(),
            body: "Use {{cite book}}".into(),
            tags: vec![],
            pinned: false,
            locked: false,
            upvotes: vec![],
            comments: vec![],
            created_at: now,
            updated_at: now,
        };
        assert!(post.toggle_upvote("u2"));
        assert_eq!(ForumPostSummary::from(&post).upvote_count, 1);
        assert!(!post.toggle_upvote("u2"));
        assert!(post.upvotes.is_empty());
    }
}
