//! 学习路径服务

use chrono::Utc;
use tracing::info;

use crate::domain::learning_path::{
    CreatePathRequest, PathProgress, PathStep, StepStatus, UpdatePathRequest,
};
use crate::domain::{LearningPath, User};
use crate::error::{ApiError, ApiResult};
use crate::services::enrollments;
use crate::state::AppState;

fn can_edit(user: &User, path: &LearningPath) -> bool {
    user.is_admin() || path.created_by == user.id
}

async fn load(state: &AppState, id: &str) -> ApiResult<LearningPath> {
    state
        .store
        .learning_paths
        .get(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Learning path '{}'", id)))
}

async fn load_editable(state: &AppState, user: &User, id: &str) -> ApiResult<LearningPath> {
    let path = load(state, id).await?;
    if !can_edit(user, &path) {
        return Err(ApiError::forbidden("Only the creator of this path can modify it"));
    }
    Ok(path)
}

/// 路径中的每门课程都必须存在
async fn ensure_courses_exist(state: &AppState, course_ids: &[String]) -> ApiResult<()> {
    for id in course_ids {
        if state.store.courses.get(id).await.is_none() {
            return Err(ApiError::bad_request(format!("Course '{}' does not exist", id)));
        }
    }
    Ok(())
}

/// 路径列表：已发布的，加上当前用户自己创建的（管理员看到全部）
pub async fn list(state: &AppState, viewer: Option<&User>) -> Vec<LearningPath> {
    let mut paths = state
        .store
        .learning_paths
        .find(|p| p.published || viewer.map_or(false, |u| can_edit(u, p)))
        .await;
    paths.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
    paths
}

pub async fn get(state: &AppState, viewer: Option<&User>, id: &str) -> ApiResult<LearningPath> {
    let path = load(state, id).await?;
    if path.published || viewer.map_or(false, |u| can_edit(u, &path)) {
        Ok(path)
    } else {
        Err(ApiError::not_found(format!("Learning path '{}'", id)))
    }
}

pub async fn create(state: &AppState, user: &User, req: CreatePathRequest) -> ApiResult<LearningPath> {
    if !user.role.can_author() {
        return Err(ApiError::forbidden("Only instructors can create learning paths"));
    }
    req.validate()?;
    ensure_courses_exist(state, &req.course_ids).await?;

    let now = Utc::now();
    let path = LearningPath {
        id: uuid::Uuid::new_v4().to_string(),
        title: req.title.trim().to_string(),
        description: req.description,
        course_ids: req.course_ids,
        created_by: user.id.clone(),
        published: req.published,
        created_at: now,
        updated_at: now,
    };

    let path = state.store.learning_paths.insert(path).await?;
    info!(path_id = %path.id, courses = path.course_ids.len(), "Learning path created");
    Ok(path)
}

pub async fn update(
    state: &AppState,
    user: &User,
    id: &str,
    req: UpdatePathRequest,
) -> ApiResult<LearningPath> {
    load_editable(state, user, id).await?;
    req.validate()?;
    if let Some(ids) = &req.course_ids {
        ensure_courses_exist(state, ids).await?;
    }

    state
        .store
        .learning_paths
        .update(id, |p| {
            if let Some(title) = req.title {
                p.title = title.trim().to_string();
            }
            if let Some(description) = req.description {
                p.description = description;
            }
            if let Some(ids) = req.course_ids {
                p.course_ids = ids;
            }
            if let Some(published) = req.published {
                p.published = published;
            }
            p.updated_at = Utc::now();
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Learning path '{}'", id)))
}

pub async fn delete(state: &AppState, user: &User, id: &str) -> ApiResult<()> {
    load_editable(state, user, id).await?;
    state.store.learning_paths.remove(id).await?;
    info!(path_id = %id, "Learning path deleted");
    Ok(())
}

/// 计算用户在路径上的进度
///
/// 已被删除的课程不再计入
pub async fn progress(state: &AppState, user: &User, id: &str) -> ApiResult<PathProgress> {
    let path = get(state, Some(user), id).await?;

    let mut steps = Vec::with_capacity(path.course_ids.len());
    for course_id in &path.course_ids {
        let Some(course) = state.store.courses.get(course_id).await else {
            continue;
        };
        let enrollment = enrollments::find(state, &user.id, course_id).await;
        let status = StepStatus::from_enrollment(enrollment.as_ref());
        let progress = match status {
            StepStatus::NotStarted => 0,
            _ => enrollment.map_or(0, |e| e.progress),
        };
        steps.push(PathStep {
            course_id: course.id,
            title: course.title,
            status,
            progress,
        });
    }

    Ok(PathProgress::from_steps(&path.id, steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EnrollmentStatus, Role};
    use crate::services::courses;
    use crate::services::courses::tests::{course_request, user_with_role};

    fn path_req(course_ids: Vec<String>) -> CreatePathRequest {
        CreatePathRequest {
            title: "New page patroller".into(),
            description: String::new(),
            course_ids,
            published: true,
        }
    }

    #[tokio::test]
    async fn test_create_requires_existing_courses() {
        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let student = user_with_role(&state, "s@wiki.org", Role::Student).await;

        assert!(matches!(
            create(&state, &owner, path_req(vec!["missing".into()])).await,
            Err(ApiError::BadRequest(_))
        ));

        let course = courses::create(&state, &owner, course_request("Notability")).await.unwrap();
        assert!(matches!(
            create(&state, &student, path_req(vec![course.id.clone()])).await,
            Err(ApiError::Forbidden(_))
        ));
        let path = create(&state, &owner, path_req(vec![course.id])).await.unwrap();
        assert_eq!(list(&state, None).await.len(), 1);

        let other = user_with_role(&state, "x@wiki.org", Role::Instructor).await;
        assert!(matches!(
            delete(&state, &other, &path.id).await,
            Err(ApiError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_progress_follows_enrollments() {
        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let student = user_with_role(&state, "s@wiki.org", Role::Student).await;
        let a = courses::create(&state, &owner, course_request("Basics")).await.unwrap();
        let b = courses::create(&state, &owner, course_request("Sourcing")).await.unwrap();
        let path = create(&state, &owner, path_req(vec![a.id.clone(), b.id.clone()]))
            .await
            .unwrap();

        let mut done = crate::domain::Enrollment::new(&student.id, &a.id);
        done.status = EnrollmentStatus::Completed;
        done.progress = 100;
        state.store.enrollments.insert(done).await.unwrap();

        let report = progress(&state, &student, &path.id).await.unwrap();
        assert_eq!(report.steps[0].status, StepStatus::Completed);
        assert_eq!(report.steps[1].status, StepStatus::NotStarted);
        assert_eq!(report.overall_progress, 50);
        assert_eq!(report.next_course_id.as_deref(), Some(b.id.as_str()));
        assert!(!report.completed);
    }
}
