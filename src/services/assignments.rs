//! 作业提交与评分服务

use chrono::Utc;
use tracing::info;

use crate::domain::assignment::{GradeRequest, SubmitAssignmentRequest};
use crate::domain::{Notification, NotificationKind, Submission, SubmissionStatus, User};
use crate::error::{ApiError, ApiResult};
use crate::services::{courses, enrollments, lessons, notifications};
use crate::state::AppState;

async fn load(state: &AppState, id: &str) -> ApiResult<Submission> {
    state
        .store
        .submissions
        .get(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Submission '{}'", id)))
}

/// 提交作业
///
/// 每个用户每个课时只能提交一次，重复提交 409；提交即完成该课时
pub async fn submit(
    state: &AppState,
    user: &User,
    lesson_id: &str,
    req: SubmitAssignmentRequest,
) -> ApiResult<Submission> {
    let lesson = lessons::load(state, lesson_id).await?;
    let max_points = lesson
        .assignment_max_points()
        .ok_or_else(|| ApiError::bad_request("This lesson is not an assignment"))?;
    enrollments::require_current(state, &user.id, &lesson.course_id).await?;
    req.validate()?;

    let submission = Submission {
        id: uuid::Uuid::new_v4().to_string(),
        lesson_id: lesson.id.clone(),
        course_id: lesson.course_id.clone(),
        user_id: user.id.clone(),
        content: req.content,
        attachment_url: req.attachment_url,
        status: SubmissionStatus::Submitted,
        grade: None,
        max_points,
        feedback: None,
        submitted_at: Utc::now(),
        graded_at: None,
    };

    let user_id = user.id.clone();
    let submission = state
        .store
        .submissions
        .insert_unique(
            submission,
            |s| s.user_id == user_id && s.lesson_id == lesson_id,
            "You have already submitted this assignment",
        )
        .await?;

    info!(
        submission_id = %submission.id,
        user_id = %user.id,
        lesson_id = %lesson_id,
        "Assignment submitted"
    );

    enrollments::record_lesson_completion(state, user, &lesson.course_id, lesson_id).await?;
    Ok(submission)
}

/// 修改自己的提交，仅在未评分且仍在课程中时允许
pub async fn resubmit(
    state: &AppState,
    user: &User,
    lesson_id: &str,
    req: SubmitAssignmentRequest,
) -> ApiResult<Submission> {
    req.validate()?;
    let existing = find_mine(state, &user.id, lesson_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Submission for lesson '{}'", lesson_id)))?;
    enrollments::require_current(state, &user.id, &existing.course_id).await?;

    state
        .store
        .submissions
        .try_update(&existing.id, |s| {
            if s.status == SubmissionStatus::Graded {
                return Err(ApiError::conflict("A graded submission can no longer be changed"));
            }
            s.content = req.content;
            s.attachment_url = req.attachment_url;
            s.submitted_at = Utc::now();
            Ok(())
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Submission '{}'", existing.id)))
}

async fn find_mine(state: &AppState, user_id: &str, lesson_id: &str) -> Option<Submission> {
    state
        .store
        .submissions
        .find_one(|s| s.user_id == user_id && s.lesson_id == lesson_id)
        .await
}

/// 获取提交（提交者本人或课程管理者）
pub async fn get(state: &AppState, user: &User, id: &str) -> ApiResult<Submission> {
    let submission = load(state, id).await?;
    if submission.user_id == user.id {
        return Ok(submission);
    }
    courses::load_managed(state, user, &submission.course_id).await?;
    Ok(submission)
}

/// 讲师评分并通知学生
pub async fn grade(state: &AppState, user: &User, id: &str, req: GradeRequest) -> ApiResult<Submission> {
    let submission = load(state, id).await?;
    let course = courses::load_managed(state, user, &submission.course_id).await?;
    req.validate(submission.max_points)?;

    let graded = state
        .store
        .submissions
        .update(id, |s| {
            s.status = SubmissionStatus::Graded;
            s.grade = Some(req.grade);
            s.feedback = req.feedback;
            s.graded_at = Some(Utc::now());
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Submission '{}'", id)))?;

    notifications::notify(
        state,
        Notification::new(
            &graded.user_id,
            NotificationKind::Grade,
            "Assignment graded",
            format!(
                "Your assignment in \"{}\" received {}/{}",
                course.title, req.grade, graded.max_points
            ),
        )
        .with_link(format!("/lessons/{}", graded.lesson_id)),
    )
    .await?;

    info!(submission_id = %id, grade = req.grade, grader = %user.id, "Submission graded");
    Ok(graded)
}

/// 课时的全部提交（课程管理者）
pub async fn list_for_lesson(state: &AppState, user: &User, lesson_id: &str) -> ApiResult<Vec<Submission>> {
    let lesson = lessons::load(state, lesson_id).await?;
    courses::load_managed(state, user, &lesson.course_id).await?;
    let mut list = state
        .store
        .submissions
        .find(|s| s.lesson_id == lesson_id)
        .await;
    list.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
    Ok(list)
}

pub async fn list_mine(state: &AppState, user_id: &str) -> Vec<Submission> {
    let mut list = state
        .store
        .submissions
        .find(|s| s.user_id == user_id)
        .await;
    list.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Lesson, LessonContent, Role};
    use crate::services::courses::tests::user_with_role;
    use crate::services::lessons::tests::{course_with_module, lesson_req};

    fn submit_req(content: &str) -> SubmitAssignmentRequest {
        SubmitAssignmentRequest {
            content: content.to_string(),
            attachment_url: None,
        }
    }

    async fn setup() -> (AppState, User, User, Lesson) {
        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let student = user_with_role(&state, "s@wiki.org", Role::Student).await;
        let (course, module) = course_with_module(&state, &owner).await;
        let content = LessonContent::Assignment {
            instructions: "Improve a stub article and link the diff".into(),
            max_points: 10,
        };
        let lesson = lessons::create(&state, &owner, &module.id, lesson_req("Stub", content))
            .await
            .unwrap();
        courses::set_published(&state, &owner, &course.id, true).await.unwrap();
        enrollments::enroll(&state, &student, &course.id).await.unwrap();
        (state, owner, student, lesson)
    }

    #[tokio::test]
    async fn test_one_submission_per_lesson() {
        let (state, _, student, lesson) = setup().await;

        let first = submit(&state, &student, &lesson.id, submit_req("Special:Diff/123"))
            .await
            .unwrap();
        assert_eq!(first.max_points, 10);

        let err = submit(&state, &student, &lesson.id, submit_req("again"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // 单课时课程，提交即完成
        let enrollment = enrollments::find(&state, &student.id, &lesson.course_id)
            .await
            .unwrap();
        assert_eq!(enrollment.progress, 100);
    }

    #[tokio::test]
    async fn test_grade_and_notify() {
        let (state, owner, student, lesson) = setup().await;
        let submission = submit(&state, &student, &lesson.id, submit_req("diff"))
            .await
            .unwrap();

        let too_high = GradeRequest {
            grade: 11,
            feedback: None,
        };
        assert!(matches!(
            grade(&state, &owner, &submission.id, too_high).await,
            Err(ApiError::Validation(_))
        ));

        let not_owner = GradeRequest {
            grade: 5,
            feedback: None,
        };
        assert!(matches!(
            grade(&state, &student, &submission.id, not_owner).await,
            Err(ApiError::Forbidden(_))
        ));

        let req = GradeRequest {
            grade: 9,
            feedback: Some("Good sourcing".into()),
        };
        let graded = grade(&state, &owner, &submission.id, req).await.unwrap();
        assert_eq!(graded.status, SubmissionStatus::Graded);
        assert_eq!(graded.grade, Some(9));

        let grade_notes = state
            .store
            .notifications
            .count(|n| n.user_id == student.id && n.kind == NotificationKind::Grade)
            .await;
        assert_eq!(grade_notes, 1);

        assert!(matches!(
            resubmit(&state, &student, &lesson.id, submit_req("late fix")).await,
            Err(ApiError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_resubmit_before_grading_and_listing() {
        let (state, owner, student, lesson) = setup().await;
        submit(&state, &student, &lesson.id, submit_req("draft")).await.unwrap();

        let updated = resubmit(&state, &student, &lesson.id, submit_req("final"))
            .await
            .unwrap();
        assert_eq!(updated.content, "final");

        assert_eq!(list_for_lesson(&state, &owner, &lesson.id).await.unwrap().len(), 1);
        assert!(list_for_lesson(&state, &student, &lesson.id).await.is_err());
        assert_eq!(list_mine(&state, &student.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_resubmit_requires_current_enrollment() {
        let (state, _, student, lesson) = setup().await;
        submit(&state, &student, &lesson.id, submit_req("draft")).await.unwrap();
        enrollments::drop_course(&state, &student, &lesson.course_id)
            .await
            .unwrap();

        let err = resubmit(&state, &student, &lesson.id, submit_req("edited"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let kept = find_mine(&state, &student.id, &lesson.id).await.unwrap();
        assert_eq!(kept.content, "draft");
    }
}
