//! 课程模块（章节）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::ValidationErrors;
use crate::config::env::constants::MAX_TITLE_LEN;

/// 模块文档
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseModule {
    pub id: String,
    pub course_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: u32,
    pub created_at: DateTime<Utc>,
}

/// 创建模块请求，未指定 order 时追加到末尾
#[derive(Debug, Deserialize)]
pub struct CreateModuleRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: Option<u32>,
}

impl CreateModuleRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text(&self.title, "title", MAX_TITLE_LEN);
        errors.max_len(Some(&self.description), "description", 5000);
        errors.finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateModuleRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<u32>,
}

impl UpdateModuleRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = &self.title {
            errors.require_text(title, "title", MAX_TITLE_LEN);
        }
        errors.max_len(self.description.as_deref(), "description", 5000);
        errors.finish()
    }
}

/// 重排请求：按列表位置赋 order
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub module_ids: Vec<String>,
}

/// 检查 `requested` 是否恰好是 `existing` 的一个排列
pub fn is_permutation(existing: &[String], requested: &[String]) -> bool {
    if existing.len() != requested.len() {
        return false;
    }
    let mut a: Vec<&String> = existing.iter().collect();
    let mut b: Vec<&String> = requested.iter().collect();
    a.sort();
    b.sort();
    a == b
}
