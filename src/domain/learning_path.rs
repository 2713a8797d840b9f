//! 学习路径与进度追踪
//!
//! 路径是有序的课程列表；每门课程的状态由用户的报名记录推导：
//! not_started -> in_progress -> completed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::enrollment::{Enrollment, EnrollmentStatus};
use super::validation::ValidationErrors;
use crate::config::env::constants::MAX_TITLE_LEN;

/// 学习路径文档
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub course_ids: Vec<String>,
    pub created_by: String,
    #[serde(default)]
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePathRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub course_ids: Vec<String>,
    #[serde(default)]
    pub published: bool,
}

impl CreatePathRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text(&self.title, "title", MAX_TITLE_LEN);
        validate_course_ids(&self.course_ids, &mut errors);
        errors.finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePathRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub course_ids: Option<Vec<String>>,
    pub published: Option<bool>,
}

impl UpdatePathRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = &self.title {
            errors.require_text(title, "title", MAX_TITLE_LEN);
        }
        if let Some(ids) = &self.course_ids {
            validate_course_ids(ids, &mut errors);
        }
        errors.finish()
    }
}

fn validate_course_ids(ids: &[String], errors: &mut ValidationErrors) {
    errors.check(!ids.is_empty(), "courseIds", "a path needs at least one course");
    let unique: HashSet<&String> = ids.iter().collect();
    errors.check(
        unique.len() == ids.len(),
        "courseIds",
        "courseIds must not contain duplicates",
    );
}

/// 单门课程在路径中的状态
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl StepStatus {
    /// 由报名记录推导状态；退课视为未开始
    pub fn from_enrollment(enrollment: Option<&Enrollment>) -> Self {
        match enrollment {
            Some(e) if e.status == EnrollmentStatus::Completed => StepStatus::Completed,
            Some(e) if e.status == EnrollmentStatus::Active => StepStatus::InProgress,
            _ => StepStatus::NotStarted,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStep {
    pub course_id: String,
    pub title: String,
    pub status: StepStatus,
    pub progress: u32,
}

/// 路径整体进度
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathProgress {
    pub path_id: String,
    pub steps: Vec<PathStep>,
    pub overall_progress: u32,
    pub completed_courses: usize,
    pub next_course_id: Option<String>,
    pub completed: bool,
}

impl PathProgress {
    /// 按路径顺序汇总各步骤
    pub fn from_steps(path_id: &str, steps: Vec<PathStep>) -> Self {
        let completed_courses = steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        let overall_progress = if steps.is_empty() {
            0
        } else {
            let sum: u32 = steps.iter().map(|s| s.progress).sum();
            (f64::from(sum) / steps.len() as f64).round() as u32
        };
        let next_course_id = steps
            .iter()
            .find(|s| s.status != StepStatus::Completed)
            .map(|s| s.course_id.clone());

        Self {
            path_id: path_id.to_string(),
            completed: !steps.is_empty() && completed_courses == steps.len(),
            steps,
            overall_progress,
            completed_courses,
            next_course_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, status: StepStatus, progress: u32) -> PathStep {
        PathStep {
            course_id: id.to_string(),
            title: id.to_uppercase(),
            status,
            progress,
        }
    }

    #[test]
    fn test_progress_summary() {
        let progress = PathProgress::from_steps(
            "p1",
            vec![
                step("a", StepStatus::Completed, 100),
                step("b", StepStatus::InProgress, 50),
                step("c", StepStatus::NotStarted, 0),
            ],
        );
        assert_eq!(progress.overall_progress, 50);
        assert_eq!(progress.completed_courses, 1);
        assert_eq!(progress.next_course_id.as_deref(), Some("b"));
        assert!(!progress.completed);
    }

    #[test]
    fn test_all_completed() {
        let progress = PathProgress::from_steps(
            "p1",
            vec![step("a", StepStatus::Completed, 100), step("b", StepStatus::Completed, 100)],
        );
        assert!(progress.completed);
        assert!(progress.next_course_id.is_none());
    }

    #[test]
    fn test_step_status_from_enrollment() {
        let mut e = Enrollment::new("u", "c");
        assert_eq!(StepStatus::from_enrollment(None), StepStatus::NotStarted);
        assert_eq!(StepStatus::from_enrollment(Some(&e)), StepStatus::InProgress);
        e.status = EnrollmentStatus::Dropped;
        assert_eq!(StepStatus::from_enrollment(Some(&e)), StepStatus::NotStarted);
        e.status = EnrollmentStatus::Completed;
        assert_eq!(StepStatus::from_enrollment(Some(&e)), StepStatus::Completed);
    }

    #[test]
    fn test_duplicate_course_ids_rejected() {
        let req = CreatePathRequest {
            title: "Become a new page patroller".into(),
            description: String::new(),
            course_ids: vec!["a".into(), "a".into()],
            published: false,
        };
        assert!(req.validate().is_err());
    }
}
