//! 报名记录与学习进度

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quiz::QuizAttempt;

/// 报名状态
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    #[default]
    Active,
    Completed,
    Dropped,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Dropped => "dropped",
        }
    }
}

/// 报名文档，(userId, courseId) 唯一
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub completed_lessons: Vec<String>,
    #[serde(default)]
    pub quiz_attempts: Vec<QuizAttempt>,
    pub enrolled_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(user_id: &str, course_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            status: EnrollmentStatus::Active,
            progress: 0,
            completed_lessons: Vec::new(),
            quiz_attempts: Vec::new(),
            enrolled_at: now,
            completed_at: None,
            last_accessed_at: now,
        }
    }

    /// 未退课（active 或 completed）
    pub fn is_current(&self) -> bool {
        self.status != EnrollmentStatus::Dropped
    }

    pub fn has_completed(&self, lesson_id: &str) -> bool {
        self.completed_lessons.iter().any(|l| l == lesson_id)
    }

    /// 记录完成的课时，返回是否为新完成
    pub fn mark_lesson_complete(&mut self, lesson_id: &str) -> bool {
        self.last_accessed_at = Utc::now();
        if self.has_completed(lesson_id) {
            return false;
        }
        self.completed_lessons.push(lesson_id.to_string());
        true
    }

    pub fn attempts_for(&self, lesson_id: &str) -> usize {
        self.quiz_attempts
            .iter()
            .filter(|a| a.lesson_id == lesson_id)
            .count()
    }

    /// 根据课程当前的课时列表重新计算进度
    ///
    /// 已删除课时的完成记录不计入；没有课时的课程进度为 0。
    /// 返回本次是否刚刚达到完成状态。
    pub fn recompute_progress(&mut self, course_lesson_ids: &[String]) -> bool {
        let total = course_lesson_ids.len();
        let done = course_lesson_ids
            .iter()
            .filter(|id| self.has_completed(id))
            .count();

        self.progress = if total == 0 {
            0
        } else {
            ((done as f64 / total as f64) * 100.0).round() as u32
        };

        if total > 0 && done == total && self.status == EnrollmentStatus::Active {
            self.status = EnrollmentStatus::Completed;
            self.completed_at = Some(Utc::now());
            return true;
        }
        false
    }

    /// 退课后重新报名
    pub fn reactivate(&mut self) {
        self.status = if self.completed_at.is_some() {
            EnrollmentStatus::Completed
        } else {
            EnrollmentStatus::Active
        };
        self.last_accessed_at = Utc::now();
    }
}

/// 报名请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub course_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("l{}", i)).collect()
    }

    #[test]
    fn test_progress_rounds_and_completes() {
        let lessons = ids(3);
        let mut e = Enrollment::new("u1", "c1");

        assert!(e.mark_lesson_complete("l0"));
        assert!(!e.mark_lesson_complete("l0"));
        assert!(!e.recompute_progress(&lessons));
        assert_eq!(e.progress, 33);

        e.mark_lesson_complete("l1");
        e.recompute_progress(&lessons);
        assert_eq!(e.progress, 67);

        e.mark_lesson_complete("l2");
        assert!(e.recompute_progress(&lessons));
        assert_eq!(e.progress, 100);
        assert_eq!(e.status, EnrollmentStatus::Completed);
        assert!(e.completed_at.is_some());

        // 已完成后不再重复触发
        assert!(!e.recompute_progress(&lessons));
    }

    #[test]
    fn test_empty_course_never_completes() {
        let mut e = Enrollment::new("u1", "c1");
        assert!(!e.recompute_progress(&[]));
        assert_eq!(e.progress, 0);
        assert_eq!(e.status, EnrollmentStatus::Active);
    }

    #[test]
    fn test_deleted_lessons_do_not_count() {
        let mut e = Enrollment::new("u1", "c1");
        e.mark_lesson_complete("gone");
        e.mark_lesson_complete("l0");
        e.recompute_progress(&ids(2));
        assert_eq!(e.progress, 50);
    }

    #[test]
    fn test_reactivate_keeps_completion() {
        let mut e = Enrollment::new("u1", "c1");
        e.status = EnrollmentStatus::Dropped;
        e.reactivate();
        assert_eq!(e.status, EnrollmentStatus::Active);

        e.completed_at = Some(Utc::now());
        e.status = EnrollmentStatus::Dropped;
        e.reactivate();
        assert_eq!(e.status, EnrollmentStatus::Completed);
    }
}
