//! 测验提交与评分
//!
//! 评分本身在 `domain::quiz` 中；这里处理报名、尝试次数与课时完成

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::domain::quiz::{QuizAttempt, QuizResult, SubmitQuizRequest};
use crate::domain::User;
use crate::error::{ApiError, ApiResult};
use crate::services::{enrollments, lessons};
use crate::state::AppState;

/// 提交测验的响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    #[serde(flatten)]
    pub result: QuizResult,
    /// 本次是第几次尝试
    pub attempt: usize,
    /// 剩余次数，不限次数时为 null
    pub attempts_remaining: Option<u32>,
    /// 提交后的课程进度
    pub progress: u32,
}

pub async fn submit_quiz(
    state: &AppState,
    user: &User,
    lesson_id: &str,
    req: SubmitQuizRequest,
) -> ApiResult<QuizSubmission> {
    let lesson = lessons::load(state, lesson_id).await?;
    let quiz = lesson
        .quiz()
        .ok_or_else(|| ApiError::bad_request("This lesson is not a quiz"))?;
    let enrollment = enrollments::require_current(state, &user.id, &lesson.course_id).await?;

    let result = quiz.grade(&req.answers);
    let max_attempts = quiz.max_attempts;

    // 次数检查与记录在同一次更新中完成
    let attempt = QuizAttempt {
        lesson_id: lesson_id.to_string(),
        score: result.score,
        passed: result.passed,
        attempted_at: Utc::now(),
    };
    let updated = state
        .store
        .enrollments
        .try_update(&enrollment.id, |e| {
            if let Some(max) = max_attempts {
                if e.attempts_for(lesson_id) >= max as usize {
                    return Err(ApiError::bad_request(format!(
                        "Maximum number of attempts ({}) reached",
                        max
                    )));
                }
            }
            e.quiz_attempts.push(attempt);
            e.last_accessed_at = Utc::now();
            Ok(())
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Enrollment '{}'", enrollment.id)))?;

    let attempt_no = updated.attempts_for(lesson_id);
    info!(
        user_id = %user.id,
        lesson_id = %lesson_id,
        score = result.score,
        passed = result.passed,
        attempt = attempt_no,
        "Quiz submitted"
    );

    let progress = if result.passed {
        enrollments::record_lesson_completion(state, user, &lesson.course_id, lesson_id)
            .await?
            .progress
    } else {
        updated.progress
    };

    Ok(QuizSubmission {
        attempts_remaining: max_attempts.map(|max| max.saturating_sub(attempt_no as u32)),
        attempt: attempt_no,
        progress,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Lesson, LessonContent, Question, QuestionType, Quiz, Role};
    use crate::services::courses;
    use crate::services::courses::tests::user_with_role;
    use crate::services::lessons::tests::{course_with_module, lesson_req};
    use std::collections::HashMap;

    fn quiz_content(max_attempts: Option<u32>) -> LessonContent {
        LessonContent::Quiz {
            quiz: Quiz {
                questions: vec![
                    Question {
                        id: "q1".into(),
                        prompt: "Is Wikipedia a reliable source for Wikipedia?".into(),
                        question_type: QuestionType::TrueFalse,
                        options: vec![],
                        correct_answer: "false".into(),
                        points: 1,
                        explanation: Some("See WP:CIRCULAR".into()),
                    },
                    Question {
                        id: "q2".into(),
                        prompt: "Where do you discuss article changes?".into(),
                        question_type: QuestionType::MultipleChoice,
                        options: vec!["Talk page".into(), "User page".into()],
                        correct_answer: "Talk page".into(),
                        points: 1,
                        explanation: None,
                    },
                ],
                passing_score: 100,
                time_limit_minutes: None,
                max_attempts,
            },
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> SubmitQuizRequest {
        SubmitQuizRequest {
            answers: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    async fn setup(max_attempts: Option<u32>) -> (AppState, User, Lesson) {
        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let student = user_with_role(&state, "s@wiki.org", Role::Student).await;
        let (course, module) = course_with_module(&state, &owner).await;
        let lesson = lessons::create(&state, &owner, &module.id, lesson_req("Quiz", quiz_content(max_attempts)))
            .await
            .unwrap();
        courses::set_published(&state, &owner, &course.id, true).await.unwrap();
        enrollments::enroll(&state, &student, &course.id).await.unwrap();
        (state, student, lesson)
    }

    #[tokio::test]
    async fn test_passing_quiz_completes_lesson() {
        let (state, student, lesson) = setup(None).await;

        let first = submit_quiz(&state, &student, &lesson.id, answers(&[("q1", "FALSE")]))
            .await
            .unwrap();
        assert_eq!(first.result.score, 50);
        assert!(!first.result.passed);
        assert_eq!(first.progress, 0);
        assert_eq!(first.attempts_remaining, None);

        let second = submit_quiz(
            &state,
            &student,
            &lesson.id,
            answers(&[("q1", "false"), ("q2", "Talk page")]),
        )
        .await
        .unwrap();
        assert!(second.result.passed);
        assert_eq!(second.attempt, 2);
        assert_eq!(second.progress, 100);
        assert_eq!(state.store.certificates.len().await, 1);
    }

    #[tokio::test]
    async fn test_max_attempts_enforced() {
        let (state, student, lesson) = setup(Some(1)).await;

        let first = submit_quiz(&state, &student, &lesson.id, answers(&[])).await.unwrap();
        assert_eq!(first.attempts_remaining, Some(0));

        let err = submit_quiz(&state, &student, &lesson.id, answers(&[("q1", "false")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let enrollment = enrollments::find(&state, &student.id, &lesson.course_id)
            .await
            .unwrap();
        assert_eq!(enrollment.quiz_attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_unenrolled_user_cannot_submit() {
        let (state, _, lesson) = setup(None).await;
        let outsider = user_with_role(&state, "x@wiki.org", Role::Student).await;
        assert!(matches!(
            submit_quiz(&state, &outsider, &lesson.id, answers(&[])).await,
            Err(ApiError::Forbidden(_))
        ));
    }
}
