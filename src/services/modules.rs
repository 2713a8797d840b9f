//! 课程模块服务

use chrono::Utc;
use tracing::info;

use crate::domain::course_module::{
    is_permutation, CreateModuleRequest, ReorderRequest, UpdateModuleRequest,
};
use crate::domain::{CourseModule, User};
use crate::error::{ApiError, ApiResult};
use crate::services::courses;
use crate::state::AppState;

pub async fn load(state: &AppState, id: &str) -> ApiResult<CourseModule> {
    state
        .store
        .modules
        .get(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Module '{}'", id)))
}

/// 课程下的模块，按 order 排序
pub async fn list_for_course(state: &AppState, course_id: &str) -> Vec<CourseModule> {
    let mut modules = state
        .store
        .modules
        .find(|m| m.course_id == course_id)
        .await;
    modules.sort_by(|a, b| a.order.cmp(&b.order).then(a.created_at.cmp(&b.created_at)));
    modules
}

pub async fn create(
    state: &AppState,
    user: &User,
    course_id: &str,
    req: CreateModuleRequest,
) -> ApiResult<CourseModule> {
    courses::load_managed(state, user, course_id).await?;
    req.validate()?;

    let order = match req.order {
        Some(order) => order,
        None => state.store.modules.count(|m| m.course_id == course_id).await as u32,
    };

    let module = CourseModule {
        id: uuid::Uuid::new_v4().to_string(),
        course_id: course_id.to_string(),
        title: req.title.trim().to_string(),
        description: req.description,
        order,
        created_at: Utc::now(),
    };

    let module = state.store.modules.insert(module).await?;
    info!(module_id = %module.id, course_id = %course_id, "Module created");
    Ok(module)
}

pub async fn update(
    state: &AppState,
    user: &User,
    id: &str,
    req: UpdateModuleRequest,
) -> ApiResult<CourseModule> {
    let module = load(state, id).await?;
    courses::load_managed(state, user, &module.course_id).await?;
    req.validate()?;

    state
        .store
        .modules
        .update(id, |m| {
            if let Some(title) = req.title {
                m.title = title.trim().to_string();
            }
            if let Some(description) = req.description {
                m.description = description;
            }
            if let Some(order) = req.order {
                m.order = order;
            }
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Module '{}'", id)))
}

/// 删除模块并级联删除其课时
pub async fn delete(state: &AppState, user: &User, id: &str) -> ApiResult<()> {
    let module = load(state, id).await?;
    courses::load_managed(state, user, &module.course_id).await?;

    let lessons = state.store.lessons.remove_where(|l| l.module_id == id).await?;
    state.store.modules.remove(id).await?;
    info!(module_id = %id, lessons, "Module deleted");
    Ok(())
}

/// 按给定顺序重排课程的全部模块
pub async fn reorder(
    state: &AppState,
    user: &User,
    course_id: &str,
    req: ReorderRequest,
) -> ApiResult<Vec<CourseModule>> {
    courses::load_managed(state, user, course_id).await?;

    let existing: Vec<String> = list_for_course(state, course_id)
        .await
        .into_iter()
        .map(|m| m.id)
        .collect();
    if !is_permutation(&existing, &req.module_ids) {
        return Err(ApiError::bad_request(
            "moduleIds must list every module of the course exactly once",
        ));
    }

    for (position, module_id) in req.module_ids.iter().enumerate() {
        state
            .store
            .modules
            .update(module_id, |m| m.order = position as u32)
            .await?;
    }

    Ok(list_for_course(state, course_id).await)
}
