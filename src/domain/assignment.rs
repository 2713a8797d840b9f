//! 作业提交

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::ValidationErrors;

/// 提交状态
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Submitted,
    Graded,
}

/// 作业提交文档，(userId, lessonId) 唯一
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub lesson_id: String,
    pub course_id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default)]
    pub grade: Option<u32>,
    #[serde(default)]
    pub max_points: u32,
    #[serde(default)]
    pub feedback: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub graded_at: Option<DateTime<Utc>>,
}

/// 提交作业请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAssignmentRequest {
    pub content: String,
    pub attachment_url: Option<String>,
}

impl SubmitAssignmentRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text(&self.content, "content", 20_000);
        errors.finish()
    }
}

/// 评分请求
#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    pub grade: u32,
    pub feedback: Option<String>,
}

impl GradeRequest {
    pub fn validate(&self, max_points: u32) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(
            self.grade <= max_points,
            "grade",
            format!("grade must be between 0 and {}", max_points),
        );
        errors.max_len(self.feedback.as_deref(), "feedback", 5000);
        errors.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_bounds() {
        let req = GradeRequest {
            grade: 11,
            feedback: None,
        };
        assert!(req.validate(10).is_err());
        assert!(GradeRequest { grade: 10, feedback: None }.validate(10).is_ok());
    }

    #[test]
    fn test_submission_requires_content() {
        let req = SubmitAssignmentRequest {
            content: "   ".into(),
            attachment_url: None,
        };
        assert_eq!(req.validate().unwrap_err().errors()[0].field, "content");
    }
}
