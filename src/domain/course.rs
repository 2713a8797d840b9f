//! 课程领域模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::ValidationErrors;
use crate::config::env::constants::MAX_TITLE_LEN;

/// 课程难度
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CourseLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// 课程文档
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub instructor_id: String,
    pub category: String,
    #[serde(default)]
    pub level: CourseLevel,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub duration_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// 关键字匹配标题、描述和标签（大小写不敏感）
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

/// 创建课程请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub level: CourseLevel,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub duration_minutes: u32,
}

impl CreateCourseRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text(&self.title, "title", MAX_TITLE_LEN);
        errors.require_text(&self.category, "category", 100);
        errors.max_len(Some(&self.description), "description", 5000);
        errors.check(
            self.tags.iter().all(|t| !t.trim().is_empty()),
            "tags",
            "tags must not be empty",
        );
        errors.finish()
    }
}

/// 更新课程请求（所有字段可选）
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    pub thumbnail_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub duration_minutes: Option<u32>,
}

impl UpdateCourseRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = &self.title {
            errors.require_text(title, "title", MAX_TITLE_LEN);
        }
        if let Some(category) = &self.category {
            errors.require_text(category, "category", 100);
        }
        errors.max_len(self.description.as_deref(), "description", 5000);
        errors.finish()
    }

    pub fn apply(self, course: &mut Course) {
        if let Some(v) = self.title {
            course.title = v.trim().to_string();
        }
        if let Some(v) = self.description {
            course.description = v;
        }
        if let Some(v) = self.category {
            course.category = v.trim().to_string();
        }
        if let Some(v) = self.level {
            course.level = v;
        }
        if let Some(v) = self.thumbnail_url {
            course.thumbnail_url = Some(v);
        }
        if let Some(v) = self.tags {
            course.tags = v;
        }
        if let Some(v) = self.duration_minutes {
            course.duration_minutes = v;
        }
        course.updated_at = Utc::now();
    }
}

/// 课程列表过滤参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseFilter {
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    /// 关键字搜索
    pub q: Option<String>,
    pub instructor: Option<String>,
    /// 是否包含未发布课程（仅对作者/管理员生效）
    #[serde(default)]
    pub include_unpublished: bool,
}
