//! 报名与学习进度服务

use chrono::Utc;
use tracing::info;

use crate::domain::{Enrollment, EnrollmentStatus, Notification, NotificationKind, User};
use crate::error::{ApiError, ApiResult};
use crate::services::{certificates, courses, lessons, notifications};
use crate::state::AppState;

/// 查找用户在课程中的报名记录（含已退课）
pub async fn find(state: &AppState, user_id: &str, course_id: &str) -> Option<Enrollment> {
    state
        .store
        .enrollments
        .find_one(|e| e.user_id == user_id && e.course_id == course_id)
        .await
}

/// 要求有效报名（未退课），否则 403
pub async fn require_current(state: &AppState, user_id: &str, course_id: &str) -> ApiResult<Enrollment> {
    match find(state, user_id, course_id).await {
        Some(e) if e.is_current() => Ok(e),
        _ => Err(ApiError::forbidden("You must be enrolled in this course")),
    }
}

/// 报名课程
///
/// 只能报名已发布课程；退课后再次报名会恢复原记录
pub async fn enroll(state: &AppState, user: &User, course_id: &str) -> ApiResult<Enrollment> {
    let course = courses::load(state, course_id).await?;
    if !course.published {
        return Err(ApiError::bad_request("This course is not open for enrollment"));
    }

    if let Some(existing) = find(state, &user.id, course_id).await {
        if existing.is_current() {
            return Err(ApiError::conflict("You are already enrolled in this course"));
        }
        let reactivated = state
            .store
            .enrollments
            .update(&existing.id, |e| e.reactivate())
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Enrollment '{}'", existing.id)))?;
        info!(user_id = %user.id, course_id = %course_id, "Enrollment reactivated");
        return Ok(reactivated);
    }

    let user_id = user.id.clone();
    let enrollment = state
        .store
        .enrollments
        .insert_unique(
            Enrollment::new(&user.id, course_id),
            |e| e.user_id == user_id && e.course_id == course_id,
            "You are already enrolled in this course",
        )
        .await?;

    notifications::notify(
        state,
        Notification::new(
            &user.id,
            NotificationKind::Enrollment,
            "Enrollment confirmed",
            format!("You are now enrolled in \"{}\"", course.title),
        )
        .with_link(format!("/courses/{}", course.id)),
    )
    .await?;

    info!(user_id = %user.id, course_id = %course_id, "User enrolled");
    Ok(enrollment)
}

/// 我的报名记录（不含已退课）
pub async fn list_mine(state: &AppState, user_id: &str) -> Vec<Enrollment> {
    let mut list = state
        .store
        .enrollments
        .find(|e| e.user_id == user_id && e.is_current())
        .await;
    list.sort_by(|a, b| b.last_accessed_at.cmp(&a.last_accessed_at));
    list
}

/// 课程的全部报名（讲师/管理员）
pub async fn list_for_course(state: &AppState, user: &User, course_id: &str) -> ApiResult<Vec<Enrollment>> {
    courses::load_managed(state, user, course_id).await?;
    let mut list = state
        .store
        .enrollments
        .find(|e| e.course_id == course_id)
        .await;
    list.sort_by(|a, b| a.enrolled_at.cmp(&b.enrolled_at));
    Ok(list)
}

/// 退课
pub async fn drop_course(state: &AppState, user: &User, course_id: &str) -> ApiResult<Enrollment> {
    let existing = require_current(state, &user.id, course_id).await?;
    let dropped = state
        .store
        .enrollments
        .update(&existing.id, |e| {
            e.status = EnrollmentStatus::Dropped;
            e.last_accessed_at = Utc::now();
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Enrollment '{}'", existing.id)))?;
    info!(user_id = %user.id, course_id = %course_id, "Enrollment dropped");
    Ok(dropped)
}

/// 学生手动完成文本/视频课时
pub async fn complete_lesson(state: &AppState, user: &User, lesson_id: &str) -> ApiResult<Enrollment> {
    let lesson = lessons::load(state, lesson_id).await?;
    if !lesson.kind().is_self_completable() {
        return Err(ApiError::bad_request(
            "Quiz lessons complete by passing the quiz and assignment lessons by submitting",
        ));
    }
    record_lesson_completion(state, user, &lesson.course_id, lesson_id).await
}

/// 记录课时完成并重新计算进度
///
/// 进度首次达到 100% 时签发证书并发送通知
pub async fn record_lesson_completion(
    state: &AppState,
    user: &User,
    course_id: &str,
    lesson_id: &str,
) -> ApiResult<Enrollment> {
    let enrollment = require_current(state, &user.id, course_id).await?;
    let lesson_ids = lessons::lesson_ids_for_course(state, course_id).await;

    let mut just_completed = false;
    let enrollment = state
        .store
        .enrollments
        .update(&enrollment.id, |e| {
            e.mark_lesson_complete(lesson_id);
            just_completed = e.recompute_progress(&lesson_ids);
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Enrollment '{}'", enrollment.id)))?;

    tracing::debug!(
        user_id = %user.id,
        course_id = %course_id,
        progress = enrollment.progress,
        "Lesson completed"
    );

    if just_completed {
        let certificate = certificates::issue(state, user, course_id).await?;
        notifications::notify(
            state,
            Notification::new(
                &user.id,
                NotificationKind::Certificate,
                "Course completed",
                format!(
                    "Congratulations! Your certificate {} is ready",
                    certificate.certificate_number
                ),
            )
            .with_link(format!("/certificates/{}", certificate.id)),
        )
        .await?;
        info!(user_id = %user.id, course_id = %course_id, "Course completed");
    }

    Ok(enrollment)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::services::courses::tests::user_with_role;
    use crate::services::lessons::tests::{course_with_module, lesson_req, text};

    #[tokio::test]
    async fn test_enroll_only_published_and_once() {
        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let student = user_with_role(&state, "s@wiki.org", Role::Student).await;
        let (course, module) = course_with_module(&state, &owner).await;
        lessons::create(&state, &owner, &module.id, lesson_req("One", text("x")))
            .await
            .unwrap();

        assert!(matches!(
            enroll(&state, &student, &course.id).await,
            Err(ApiError::BadRequest(_))
        ));

        courses::set_published(&state, &owner, &course.id, true).await.unwrap();
        enroll(&state, &student, &course.id).await.unwrap();
        assert!(matches!(
            enroll(&state, &student, &course.id).await,
            Err(ApiError::Conflict(_))
        ));

        drop_course(&state, &student, &course.id).await.unwrap();
        assert!(list_mine(&state, &student.id).await.is_empty());
        let again = enroll(&state, &student, &course.id).await.unwrap();
        assert_eq!(again.status, EnrollmentStatus::Active);
        assert_eq!(state.store.enrollments.len().await, 1);

        let kinds: Vec<_> = state
            .store
            .notifications
            .find(|n| n.user_id == student.id)
            .await
            .into_iter()
            .map(|n| n.kind)
            .collect();
        assert_eq!(kinds, vec![NotificationKind::Enrollment]);
    }

    #[tokio::test]
    async fn test_completing_all_lessons_issues_certificate() {
        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let student = user_with_role(&state, "s@wiki.org", Role::Student).await;
        let (course, module) = course_with_module(&state, &owner).await;
        let l1 = lessons::create(&state, &owner, &module.id, lesson_req("One", text("x")))
            .await
            .unwrap();
        let l2 = lessons::create(&state, &owner, &module.id, lesson_req("Two", text("y")))
            .await
            .unwrap();
        courses::set_published(&state, &owner, &course.id, true).await.unwrap();
        enroll(&state, &student, &course.id).await.unwrap();

        let e = complete_lesson(&state, &student, &l1.id).await.unwrap();
        assert_eq!(e.progress, 50);
        assert!(state.store.certificates.is_empty().await);

        let e = complete_lesson(&state, &student, &l2.id).await.unwrap();
        assert_eq!(e.progress, 100);
        assert_eq!(e.status, EnrollmentStatus::Completed);
        assert_eq!(state.store.certificates.len().await, 1);

        // 重复完成不会再签发
        complete_lesson(&state, &student, &l2.id).await.unwrap();
        assert_eq!(state.store.certificates.len().await, 1);
    }

    #[tokio::test]
    async fn test_complete_requires_enrollment() {
        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let student = user_with_role(&state, "s@wiki.org", Role::Student).await;
        let (_, module) = course_with_module(&state, &owner).await;
        let lesson = lessons::create(&state, &owner, &module.id, lesson_req("One", text("x")))
            .await
            .unwrap();

        assert!(matches!(
            complete_lesson(&state, &student, &lesson.id).await,
            Err(ApiError::Forbidden(_))
        ));
    }
}
