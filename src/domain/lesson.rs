//! 课时领域模型
//!
//! 课时内容是带标签的枚举：文本（wikitext）、视频、测验、作业

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quiz::{PublicQuiz, Quiz};
use super::validation::ValidationErrors;
use crate::config::env::constants::MAX_TITLE_LEN;

/// 课时内容
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LessonContent {
    Text {
        #[serde(default)]
        body: String,
    },
    #[serde(rename_all = "camelCase")]
    Video {
        video_url: String,
        #[serde(default)]
        duration_seconds: u32,
    },
    Quiz { quiz: Quiz },
    #[serde(rename_all = "camelCase")]
    Assignment {
        instructions: String,
        max_points: u32,
    },
}

impl LessonContent {
    pub fn kind(&self) -> LessonKind {
        match self {
            LessonContent::Text { .. } => LessonKind::Text,
            LessonContent::Video { .. } => LessonKind::Video,
            LessonContent::Quiz { .. } => LessonKind::Quiz,
            LessonContent::Assignment { .. } => LessonKind::Assignment,
        }
    }

    /// 规范化（为题目生成 id）后校验
    pub fn prepare(&mut self) -> Result<(), ValidationErrors> {
        if let LessonContent::Quiz { quiz } = self {
            quiz.assign_question_ids();
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match self {
            LessonContent::Text { body } => {
                errors.check(body.len() <= 200_000, "content.body", "body is too long");
            }
            LessonContent::Video { video_url, .. } => {
                errors.check(
                    !video_url.trim().is_empty(),
                    "content.videoUrl",
                    "videoUrl is required",
                );
            }
            LessonContent::Quiz { quiz } => {
                if let Err(e) = quiz.validate() {
                    errors.merge_prefixed("content.quiz", e);
                }
            }
            LessonContent::Assignment {
                instructions,
                max_points,
            } => {
                errors.require_text(instructions, "content.instructions", 20_000);
                errors.check(
                    *max_points > 0,
                    "content.maxPoints",
                    "maxPoints must be greater than 0",
                );
            }
        }
        errors.finish()
    }
}

/// 课时类型（不含内容）
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LessonKind {
    Text,
    Video,
    Quiz,
    Assignment,
}

impl LessonKind {
    /// 是否可以由学生手动标记完成
    pub fn is_self_completable(&self) -> bool {
        matches!(self, LessonKind::Text | LessonKind::Video)
    }
}

/// 课时文档
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub module_id: String,
    pub course_id: String,
    pub title: String,
    pub order: u32,
    #[serde(default)]
    pub duration_minutes: u32,
    pub content: LessonContent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lesson {
    pub fn kind(&self) -> LessonKind {
        self.content.kind()
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        match &self.content {
            LessonContent::Quiz { quiz } => Some(quiz),
            _ => None,
        }
    }

    pub fn assignment_max_points(&self) -> Option<u32> {
        match &self.content {
            LessonContent::Assignment { max_points, .. } => Some(*max_points),
            _ => None,
        }
    }

    /// 学生视图：测验去掉答案
    pub fn student_view(&self) -> LessonView {
        let content = match &self.content {
            LessonContent::Quiz { quiz } => LessonViewContent::Quiz {
                kind: LessonKind::Quiz,
                quiz: quiz.public_view(),
            },
            other => LessonViewContent::Full(other.clone()),
        };
        LessonView {
            id: self.id.clone(),
            module_id: self.module_id.clone(),
            course_id: self.course_id.clone(),
            title: self.title.clone(),
            order: self.order,
            duration_minutes: self.duration_minutes,
            content,
        }
    }
}

/// 面向学生的课时
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
    pub id: String,
    pub module_id: String,
    pub course_id: String,
    pub title: String,
    pub order: u32,
    pub duration_minutes: u32,
    pub content: LessonViewContent,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum LessonViewContent {
    Full(LessonContent),
    Quiz {
        #[serde(rename = "type")]
        kind: LessonKind,
        quiz: PublicQuiz,
    },
}

/// 创建课时请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLessonRequest {
    pub title: String,
    pub order: Option<u32>,
    #[serde(default)]
    pub duration_minutes: u32,
    pub content: LessonContent,
}

impl CreateLessonRequest {
    pub fn validate(&mut self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text(&self.title, "title", MAX_TITLE_LEN);
        if let Err(e) = self.content.prepare() {
            errors.extend(e);
        }
        errors.finish()
    }
}

/// 更新课时请求
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLessonRequest {
    pub title: Option<String>,
    pub order: Option<u32>,
    pub duration_minutes: Option<u32>,
    pub content: Option<LessonContent>,
}

impl UpdateLessonRequest {
    pub fn validate(&mut self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = &self.title {
            errors.require_text(title, "title", MAX_TITLE_LEN);
        }
        if let Some(content) = self.content.as_mut() {
            if let Err(e) = content.prepare() {
                errors.extend(e);
            }
        }
        errors.finish()
    }
}
