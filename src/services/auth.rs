//! 认证服务
//!
//! 注册、登录、会话管理。密码使用加盐 SHA-256 存储，token 为随机 UUID

use chrono::{Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::env::constants::MIN_PASSWORD_LEN;
use crate::domain::user::{normalize_email, LoginRequest, RegisterRequest};
use crate::domain::{PublicUser, Role, Session, User};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 登录/注册响应
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// 计算密码哈希
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 校验密码（定长比较）
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    let actual = hash_password(password, salt);
    actual.len() == expected_hash.len()
        && actual
            .bytes()
            .zip(expected_hash.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// 创建用户（email 唯一）
pub async fn create_user(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> ApiResult<User> {
    let email = normalize_email(email);
    let salt = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.trim().to_string(),
        email: email.clone(),
        password_hash: hash_password(password, &salt),
        salt,
        role,
        bio: None,
        avatar_url: None,
        created_at: now,
        updated_at: now,
    };

    let user = state
        .store
        .users
        .insert_unique(
            user,
            |u| u.email == email,
            "An account with this email already exists",
        )
        .await?;

    info!(user_id = %user.id, role = user.role.as_str(), "User created");
    Ok(user)
}

/// 为用户创建会话
pub async fn create_session(state: &AppState, user_id: &str) -> ApiResult<Session> {
    let now = Utc::now();
    let session = Session {
        token: uuid::Uuid::new_v4().simple().to_string(),
        user_id: user_id.to_string(),
        created_at: now,
        expires_at: now + Duration::hours(state.config.token_ttl_hours),
    };
    Ok(state.store.sessions.insert(session).await?)
}

/// 注册（公开注册一律为学生）
pub async fn register(state: &AppState, req: RegisterRequest) -> ApiResult<AuthResponse> {
    req.validate(MIN_PASSWORD_LEN)?;
    let user = create_user(state, &req.name, &req.email, &req.password, Role::Student).await?;
    let session = create_session(state, &user.id).await?;
    Ok(AuthResponse {
        token: session.token,
        user: user.to_public(),
    })
}

/// 登录
pub async fn login(state: &AppState, req: LoginRequest) -> ApiResult<AuthResponse> {
    let email = normalize_email(&req.email);
    let user = state.store.users.find_one(|u| u.email == email).await;

    let user = match user {
        Some(u) if verify_password(&req.password, &u.salt, &u.password_hash) => u,
        _ => {
            warn!("Failed login attempt");
            return Err(ApiError::unauthorized("Invalid email or password"));
        }
    };

    let session = create_session(state, &user.id).await?;
    info!(user_id = %user.id, "User logged in");
    Ok(AuthResponse {
        token: session.token,
        user: user.to_public(),
    })
}

/// 注销
pub async fn logout(state: &AppState, token: &str) -> ApiResult<()> {
    state.store.sessions.remove(token).await?;
    Ok(())
}

/// 根据 token 找到当前用户；过期会话会被删除
pub async fn authenticate(state: &AppState, token: &str) -> ApiResult<User> {
    let session = state
        .store
        .sessions
        .get(token)
        .await
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    if session.is_expired(Utc::now()) {
        state.store.sessions.remove(token).await?;
        return Err(ApiError::unauthorized("Invalid or expired token"));
    }

    state
        .store
        .users
        .get(&session.user_id)
        .await
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))
}

/// 清理过期会话，返回清理数量
pub async fn purge_expired_sessions(state: &AppState) -> ApiResult<usize> {
    let now = Utc::now();
    Ok(state
        .store
        .sessions
        .remove_where(|s| s.is_expired(now))
        .await?)
}

/// 启动时按配置创建管理员账号（邮箱已存在则跳过）
pub async fn seed_admin(state: &AppState) -> ApiResult<()> {
    let Some(seed) = state.config.admin.clone() else {
        return Ok(());
    };

    let email = normalize_email(&seed.email);
    if state.store.users.find_one(|u| u.email == email).await.is_some() {
        info!("Admin seed account already exists");
        return Ok(());
    }

    create_user(state, "Administrator", &email, &seed.password, Role::Admin).await?;
    info!("Seeded admin account");
    Ok(())
}
