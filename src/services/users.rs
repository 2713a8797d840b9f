//! 用户资料与角色管理

use chrono::Utc;
use tracing::info;

use crate::domain::user::UpdateProfileRequest;
use crate::domain::{Page, PageQuery, PublicUser, Role, User};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 全部用户（管理员），按注册时间排序
pub async fn list(state: &AppState, page: PageQuery) -> Page<PublicUser> {
    let mut users = state.store.users.find(|_| true).await;
    users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Page::paginate(users, page).map(|u| u.to_public())
}

pub async fn get(state: &AppState, id: &str) -> ApiResult<PublicUser> {
    state
        .store
        .users
        .get(id)
        .await
        .map(|u| u.to_public())
        .ok_or_else(|| ApiError::not_found(format!("User '{}'", id)))
}

/// 更新自己的资料，空字符串表示清空 bio / avatar
pub async fn update_me(state: &AppState, user: &User, req: UpdateProfileRequest) -> ApiResult<PublicUser> {
    req.validate()?;
    let updated = state
        .store
        .users
        .update(&user.id, |u| {
            if let Some(name) = req.name {
                u.name = name.trim().to_string();
            }
            if let Some(bio) = req.bio {
                u.bio = Some(bio).filter(|b| !b.trim().is_empty());
            }
            if let Some(avatar) = req.avatar_url {
                u.avatar_url = Some(avatar).filter(|a| !a.trim().is_empty());
            }
            u.updated_at = Utc::now();
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User '{}'", user.id)))?;
    Ok(updated.to_public())
}

/// 修改角色（管理员）；不能修改自己的角色
pub async fn set_role(state: &AppState, admin: &User, id: &str, role: Role) -> ApiResult<PublicUser> {
    if admin.id == id {
        return Err(ApiError::bad_request("You cannot change your own role"));
    }
    let updated = state
        .store
        .users
        .update(id, |u| {
            u.role = role;
            u.updated_at = Utc::now();
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User '{}'", id)))?;

    info!(user_id = %id, role = role.as_str(), by = %admin.id, "User role changed");
    Ok(updated.to_public())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::courses::tests::user_with_role;

    #[tokio::test]
    async fn test_update_profile_and_role() {
        let state = AppState::in_memory();
        let admin = user_with_role(&state, "a@wiki.org", Role::Admin).await;
        let user = user_with_role(&state, "u@wiki.org", Role::Student).await;

        let req = UpdateProfileRequest {
            name: Some(" Jimbo ".into()),
            bio: Some("Editing since 2004".into()),
            avatar_url: None,
        };
        let updated = update_me(&state, &user, req).await.unwrap();
        assert_eq!(updated.name, "Jimbo");
        assert_eq!(updated.bio.as_deref(), Some("Editing since 2004"));

        let promoted = set_role(&state, &admin, &user.id, Role::Instructor).await.unwrap();
        assert_eq!(promoted.role, Role::Instructor);
        assert!(set_role(&state, &admin, &admin.id, Role::Student).await.is_err());

        assert_eq!(list(&state, PageQuery::default()).await.total, 2);
        assert!(matches!(get(&state, "missing").await, Err(ApiError::NotFound(_))));
    }
}
