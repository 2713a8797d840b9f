//! Bearer token 认证中间件
//!
//! 提供 `AuthUser` / `OptionalAuthUser` extractor，替代每个 handler 中重复的 token 校验逻辑

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, header::HeaderMap, request::Parts},
};
use std::sync::Arc;

use crate::domain::{Role, User};
use crate::error::ApiError;
use crate::services::auth;
use crate::state::AppState;

/// 已认证用户 Extractor
///
/// 在需要登录的 handler 中使用，自动验证 `Authorization: Bearer <token>`
///
/// # Example
///
/// ```ignore
/// async fn protected_handler(
///     AuthUser { user, .. }: AuthUser,
///     State(state): State<Arc<AppState>>,
/// ) -> impl IntoResponse {
///     // handler 逻辑...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

impl AuthUser {
    /// 要求特定角色之一
    pub fn require_role(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.user.role) {
            Ok(())
        } else {
            tracing::warn!(user_id = %self.user.id, role = self.user.role.as_str(), "Role check failed");
            Err(ApiError::forbidden("You do not have permission to perform this action"))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require_role(&[Role::Admin])
    }

    /// 讲师或管理员
    pub fn require_author(&self) -> Result<(), ApiError> {
        self.require_role(&[Role::Instructor, Role::Admin])
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            tracing::debug!("Missing bearer token");
            ApiError::unauthorized("Authentication required")
        })?;

        let user = auth::authenticate(state, &token).await?;
        Ok(AuthUser { user, token })
    }
}

/// 从 `Authorization` header 中取出 bearer token
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token.to_string())
    } else {
        None
    }
}

/// 可选认证 Extractor
///
/// 未提供 token 时允许通过；提供了但无效时返回 401
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers) {
            Some(token) => Ok(OptionalAuthUser(Some(auth::authenticate(state, &token).await?))),
            None => Ok(OptionalAuthUser(None)),
        }
    }
}
