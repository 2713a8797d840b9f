//! 课时服务

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::domain::lesson::{CreateLessonRequest, LessonView, UpdateLessonRequest};
use crate::domain::{Lesson, User};
use crate::error::{ApiError, ApiResult};
use crate::services::{courses, enrollments, modules};
use crate::state::AppState;

/// 课时响应：管理者看到完整内容，学生看到去掉答案的视图
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LessonResponse {
    Full(Lesson),
    Student(LessonView),
}

pub async fn load(state: &AppState, id: &str) -> ApiResult<Lesson> {
    state
        .store
        .lessons
        .get(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Lesson '{}'", id)))
}

pub async fn list_for_module(state: &AppState, module_id: &str) -> Vec<Lesson> {
    let mut lessons = state
        .store
        .lessons
        .find(|l| l.module_id == module_id)
        .await;
    lessons.sort_by(|a, b| a.order.cmp(&b.order).then(a.created_at.cmp(&b.created_at)));
    lessons
}

/// 课程全部课时，按模块顺序再按课时顺序
pub async fn list_for_course(state: &AppState, course_id: &str) -> Vec<Lesson> {
    let mut ordered = Vec::new();
    for module in modules::list_for_course(state, course_id).await {
        ordered.extend(list_for_module(state, &module.id).await);
    }
    ordered
}

/// 课程全部课时 id（进度计算用）
pub async fn lesson_ids_for_course(state: &AppState, course_id: &str) -> Vec<String> {
    state
        .store
        .lessons
        .find(|l| l.course_id == course_id)
        .await
        .into_iter()
        .map(|l| l.id)
        .collect()
}

/// 按查看者身份获取课时
///
/// 管理者看到完整内容；其他用户需要已发布课程的有效报名
pub async fn get_for_viewer(state: &AppState, user: &User, id: &str) -> ApiResult<LessonResponse> {
    let lesson = load(state, id).await?;
    let course = courses::load(state, &lesson.course_id).await?;

    if courses::can_manage(user, &course) {
        return Ok(LessonResponse::Full(lesson));
    }
    if !course.published {
        return Err(ApiError::not_found(format!("Lesson '{}'", id)));
    }
    enrollments::require_current(state, &user.id, &course.id).await?;
    Ok(LessonResponse::Student(lesson.student_view()))
}

/// 按查看者身份列出模块下的课时
pub async fn list_for_module_viewer(
    state: &AppState,
    user: &User,
    module_id: &str,
) -> ApiResult<Vec<LessonResponse>> {
    let module = modules::load(state, module_id).await?;
    let course = courses::load(state, &module.course_id).await?;
    let lessons = list_for_module(state, module_id).await;

    if courses::can_manage(user, &course) {
        return Ok(lessons.into_iter().map(LessonResponse::Full).collect());
    }
    if !course.published {
        return Err(ApiError::not_found(format!("Module '{}'", module_id)));
    }
    enrollments::require_current(state, &user.id, &course.id).await?;
    Ok(lessons
        .iter()
        .map(|l| LessonResponse::Student(l.student_view()))
        .collect())
}

pub async fn create(
    state: &AppState,
    user: &User,
    module_id: &str,
    mut req: CreateLessonRequest,
) -> ApiResult<Lesson> {
    let module = modules::load(state, module_id).await?;
    courses::load_managed(state, user, &module.course_id).await?;
    req.validate()?;

    let order = match req.order {
        Some(order) => order,
        None => state.store.lessons.count(|l| l.module_id == module_id).await as u32,
    };

    let now = Utc::now();
    let lesson = Lesson {
        id: uuid::Uuid::new_v4().to_string(),
        module_id: module.id.clone(),
        course_id: module.course_id.clone(),
        title: req.title.trim().to_string(),
        order,
        duration_minutes: req.duration_minutes,
        content: req.content,
        created_at: now,
        updated_at: now,
    };

    let lesson = state.store.lessons.insert(lesson).await?;
    info!(
        lesson_id = %lesson.id,
        module_id = %module_id,
        kind = ?lesson.kind(),
        "Lesson created"
    );
    Ok(lesson)
}

pub async fn update(
    state: &AppState,
    user: &User,
    id: &str,
    mut req: UpdateLessonRequest,
) -> ApiResult<Lesson> {
    let lesson = load(state, id).await?;
    courses::load_managed(state, user, &lesson.course_id).await?;
    req.validate()?;

    state
        .store
        .lessons
        .update(id, |l| {
            if let Some(title) = req.title {
                l.title = title.trim().to_string();
            }
            if let Some(order) = req.order {
                l.order = order;
            }
            if let Some(duration) = req.duration_minutes {
                l.duration_minutes = duration;
            }
            if let Some(content) = req.content {
                l.content = content;
            }
            l.updated_at = Utc::now();
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Lesson '{}'", id)))
}

/// 删除课时及其作业提交
pub async fn delete(state: &AppState, user: &User, id: &str) -> ApiResult<()> {
    let lesson = load(state, id).await?;
    courses::load_managed(state, user, &lesson.course_id).await?;

    let submissions = state.store.submissions.remove_where(|s| s.lesson_id == id).await?;
    state.store.lessons.remove(id).await?;
    info!(lesson_id = %id, submissions, "Lesson deleted");
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::course_module::CreateModuleRequest;
    use crate::domain::{Course, CourseModule, LessonContent, Role};
    use crate::services::courses::tests::{course_request, user_with_role};

    /// 创建一门带一个模块的课程
    pub(crate) async fn course_with_module(state: &AppState, owner: &User) -> (Course, CourseModule) {
        let course = courses::create(state, owner, course_request("Wikipedia 101"))
            .await
            .unwrap();
        let module = modules::create(
            state,
            owner,
            &course.id,
            CreateModuleRequest {
                title: "Getting started".into(),
                description: String::new(),
                order: None,
            },
        )
        .await
        .unwrap();
        (course, module)
    }

    pub(crate) fn lesson_req(title: &str, content: LessonContent) -> CreateLessonRequest {
        CreateLessonRequest {
            title: title.to_string(),
            order: None,
            duration_minutes: 5,
            content,
        }
    }

    pub(crate) fn text(body: &str) -> LessonContent {
        LessonContent::Text {
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_lessons_are_ordered_within_course() {
        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let (course, module) = course_with_module(&state, &owner).await;

        create(&state, &owner, &module.id, lesson_req("First", text("'''Hi'''")))
            .await
            .unwrap();
        create(&state, &owner, &module.id, lesson_req("Second", text("")))
            .await
            .unwrap();

        let titles: Vec<_> = list_for_course(&state, &course.id)
            .await
            .into_iter()
            .map(|l| l.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_invalid_content_rejected() {
        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let (_, module) = course_with_module(&state, &owner).await;

        let req = lesson_req(
            "Video",
            LessonContent::Video {
                video_url: " ".into(),
                duration_seconds: 0,
            },
        );
        assert!(matches!(
            create(&state, &owner, &module.id, req).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unenrolled_student_cannot_view_lesson() {
        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let student = user_with_role(&state, "s@wiki.org", Role::Student).await;
        let (course, module) = course_with_module(&state, &owner).await;
        let lesson = create(&state, &owner, &module.id, lesson_req("Intro", text("x")))
            .await
            .unwrap();
        courses::set_published(&state, &owner, &course.id, true).await.unwrap();

        assert!(matches!(
            get_for_viewer(&state, &student, &lesson.id).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            get_for_viewer(&state, &owner, &lesson.id).await,
            Ok(LessonResponse::Full(_))
        ));
    }
}
