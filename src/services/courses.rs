//! 课程服务

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::domain::course::{CourseFilter, CreateCourseRequest, UpdateCourseRequest};
use crate::domain::{Course, CourseModule, Enrollment, LessonKind, Page, PageQuery, PublicUser, User};
use crate::error::{ApiError, ApiResult};
use crate::services::{enrollments, lessons, modules};
use crate::state::AppState;

/// 课程详情：课程、讲师、模块与课时大纲、当前用户的报名
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub instructor: Option<PublicUser>,
    pub modules: Vec<ModuleOutline>,
    pub lesson_count: usize,
    pub enrollment_count: usize,
    pub enrollment: Option<Enrollment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOutline {
    #[serde(flatten)]
    pub module: CourseModule,
    pub lessons: Vec<LessonOutline>,
}

/// 大纲中的课时，不含内容
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonOutline {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: LessonKind,
    pub order: u32,
    pub duration_minutes: u32,
}

/// 加载课程，不存在时 404
pub async fn load(state: &AppState, id: &str) -> ApiResult<Course> {
    state
        .store
        .courses
        .get(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Course '{}'", id)))
}

/// 当前用户是否可以管理该课程（课程讲师或管理员）
pub fn can_manage(user: &User, course: &Course) -> bool {
    user.is_admin() || course.instructor_id == user.id
}

pub fn ensure_can_manage(user: &User, course: &Course) -> ApiResult<()> {
    if can_manage(user, course) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only the course instructor can modify this course"))
    }
}

/// 加载课程并检查管理权限
pub async fn load_managed(state: &AppState, user: &User, id: &str) -> ApiResult<Course> {
    let course = load(state, id).await?;
    ensure_can_manage(user, &course)?;
    Ok(course)
}

/// 加载对当前用户可见的课程：未发布课程只有管理者可见
pub async fn load_visible(state: &AppState, viewer: Option<&User>, id: &str) -> ApiResult<Course> {
    let course = load(state, id).await?;
    if course.published || viewer.map_or(false, |u| can_manage(u, &course)) {
        Ok(course)
    } else {
        Err(ApiError::not_found(format!("Course '{}'", id)))
    }
}

/// 课程详情
pub async fn detail(state: &AppState, viewer: Option<&User>, id: &str) -> ApiResult<CourseDetail> {
    let course = load_visible(state, viewer, id).await?;

    let mut outline = Vec::new();
    let mut lesson_count = 0;
    for module in modules::list_for_course(state, id).await {
        let lessons: Vec<LessonOutline> = lessons::list_for_module(state, &module.id)
            .await
            .into_iter()
            .map(|l| LessonOutline {
                kind: l.kind(),
                id: l.id,
                title: l.title,
                order: l.order,
                duration_minutes: l.duration_minutes,
            })
            .collect();
        lesson_count += lessons.len();
        outline.push(ModuleOutline { module, lessons });
    }

    let instructor = state
        .store
        .users
        .get(&course.instructor_id)
        .await
        .map(|u| u.to_public());
    let enrollment_count = state
        .store
        .enrollments
        .count(|e| e.course_id == id && e.is_current())
        .await;
    let enrollment = match viewer {
        Some(u) => enrollments::find(state, &u.id, id).await,
        None => None,
    };

    Ok(CourseDetail {
        course,
        instructor,
        modules: outline,
        lesson_count,
        enrollment_count,
        enrollment,
    })
}

/// 课程列表
///
/// 默认只列出已发布课程；`include_unpublished` 时额外包含当前用户可管理的未发布课程
pub async fn list(
    state: &AppState,
    viewer: Option<&User>,
    filter: &CourseFilter,
    page: PageQuery,
) -> Page<Course> {
    let mut courses = state
        .store
        .courses
        .find(|c| {
            let visible = c.published
                || (filter.include_unpublished && viewer.map_or(false, |u| can_manage(u, c)));
            visible
                && filter
                    .category
                    .as_ref()
                    .map_or(true, |cat| c.category.eq_ignore_ascii_case(cat))
                && filter.level.map_or(true, |l| c.level == l)
                && filter
                    .instructor
                    .as_ref()
                    .map_or(true, |i| &c.instructor_id == i)
                && filter.q.as_ref().map_or(true, |q| c.matches_search(q))
        })
        .await;

    courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Page::paginate(courses, page)
}

pub async fn create(state: &AppState, user: &User, req: CreateCourseRequest) -> ApiResult<Course> {
    if !user.role.can_author() {
        return Err(ApiError::forbidden("Only instructors can create courses"));
    }
    req.validate()?;

    let now = Utc::now();
    let course = Course {
        id: uuid::Uuid::new_v4().to_string(),
        title: req.title.trim().to_string(),
        description: req.description,
        instructor_id: user.id.clone(),
        category: req.category.trim().to_string(),
        level: req.level,
        thumbnail_url: req.thumbnail_url,
        tags: req.tags,
        published: false,
        duration_minutes: req.duration_minutes,
        created_at: now,
        updated_at: now,
    };

    let course = state.store.courses.insert(course).await?;
    info!(course_id = %course.id, instructor_id = %user.id, "Course created");
    Ok(course)
}

pub async fn update(
    state: &AppState,
    user: &User,
    id: &str,
    req: UpdateCourseRequest,
) -> ApiResult<Course> {
    load_managed(state, user, id).await?;
    req.validate()?;

    state
        .store
        .courses
        .update(id, |c| req.apply(c))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Course '{}'", id)))
}

/// 发布 / 取消发布
pub async fn set_published(
    state: &AppState,
    user: &User,
    id: &str,
    published: bool,
) -> ApiResult<Course> {
    load_managed(state, user, id).await?;

    if published {
        let lessons = state.store.lessons.count(|l| l.course_id == id).await;
        if lessons == 0 {
            return Err(ApiError::bad_request("A course needs at least one lesson before publishing"));
        }
    }

    let course = state
        .store
        .courses
        .update(id, |c| {
            c.published = published;
            c.updated_at = Utc::now();
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Course '{}'", id)))?;

    info!(course_id = %id, published, "Course publish state changed");
    Ok(course)
}

/// 删除课程并级联删除模块、课时、报名、作业与论坛帖子；证书保留
pub async fn delete(state: &AppState, user: &User, id: &str) -> ApiResult<()> {
    load_managed(state, user, id).await?;

    let store = &state.store;
    let modules = store.modules.remove_where(|m| m.course_id == id).await?;
    let lessons = store.lessons.remove_where(|l| l.course_id == id).await?;
    let enrollments = store.enrollments.remove_where(|e| e.course_id == id).await?;
    let submissions = store.submissions.remove_where(|s| s.course_id == id).await?;
    let posts = store
        .forum_posts
        .remove_where(|p| p.course_id.as_deref() == Some(id))
        .await?;
    store.courses.remove(id).await?;

    info!(
        course_id = %id,
        modules,
        lessons,
        enrollments,
        submissions,
        posts,
        "Course deleted"
    );
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{CourseLevel, Role};
    use crate::services::auth;

    pub(crate) async fn user_with_role(state: &AppState, email: &str, role: Role) -> User {
        auth::create_user(state, "Test User", email, "password123", role)
            .await
            .unwrap()
    }

    pub(crate) fn course_request(title: &str) -> CreateCourseRequest {
        CreateCourseRequest {
            title: title.to_string(),
            description: "Learn to edit".into(),
            category: "Basics".into(),
            level: CourseLevel::Beginner,
            thumbnail_url: None,
            tags: vec!["editing".into()],
            duration_minutes: 60,
        }
    }

    #[tokio::test]
    async fn test_students_cannot_create_courses() {
        let state = AppState::in_memory();
        let student = user_with_role(&state, "s@wiki.org", Role::Student).await;
        let err = create(&state, &student, course_request("Nope")).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_only_owner_or_admin_updates() {
        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let other = user_with_role(&state, "x@wiki.org", Role::Instructor).await;
        let admin = user_with_role(&state, "a@wiki.org", Role::Admin).await;
        let course = create(&state, &owner, course_request("Talk pages")).await.unwrap();

        let req = UpdateCourseRequest {
            title: Some("Talk page etiquette".into()),
            ..Default::default()
        };
        assert!(matches!(
            update(&state, &other, &course.id, req).await,
            Err(ApiError::Forbidden(_))
        ));

        let req = UpdateCourseRequest {
            title: Some("Talk page etiquette".into()),
            ..Default::default()
        };
        let updated = update(&state, &admin, &course.id, req).await.unwrap();
        assert_eq!(updated.title, "Talk page etiquette");
    }

    #[tokio::test]
    async fn test_unpublished_courses_hidden_from_listing() {
        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let course = create(&state, &owner, course_request("Drafts")).await.unwrap();

        let page = list(&state, None, &CourseFilter::default(), PageQuery::default()).await;
        assert_eq!(page.total, 0);

        let filter = CourseFilter {
            include_unpublished: true,
            ..Default::default()
        };
        let page = list(&state, Some(&owner), &filter, PageQuery::default()).await;
        assert_eq!(page.total, 1);

        assert!(load_visible(&state, None, &course.id).await.is_err());
        assert!(load_visible(&state, Some(&owner), &course.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_detail_outlines_modules() {
        use crate::domain::course_module::CreateModuleRequest;

        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let course = create(&state, &owner, course_request("Outline")).await.unwrap();
        modules::create(
            &state,
            &owner,
            &course.id,
            CreateModuleRequest {
                title: "Intro".into(),
                description: String::new(),
                order: None,
            },
        )
        .await
        .unwrap();

        let d = detail(&state, Some(&owner), &course.id).await.unwrap();
        assert_eq!(d.modules.len(), 1);
        assert_eq!(d.lesson_count, 0);
        assert_eq!(d.instructor.map(|i| i.id), Some(owner.id.clone()));
        assert!(d.enrollment.is_none());
        assert!(detail(&state, None, &course.id).await.is_err());
    }

    #[tokio::test]
    async fn test_publish_requires_lessons() {
        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let course = create(&state, &owner, course_request("Empty")).await.unwrap();
        assert!(matches!(
            set_published(&state, &owner, &course.id, true).await,
            Err(ApiError::BadRequest(_))
        ));
    }
}
