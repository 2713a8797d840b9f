//! 论坛 API
//!
//! 包含 /api/forum/posts/* 端点

use axum::{
    extract::{Path, State},
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::api::extract::{ApiJson, ApiQuery};
use crate::domain::forum::{
    CommentRequest, CreatePostRequest, ForumPostSummary, ModerateRequest, PostFilter,
    UpdatePostRequest,
};
use crate::domain::{ForumPost, Page, PageQuery};
use crate::error::{ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::services::forum;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/forum/posts", get(list_posts).post(create_post))
        .route("/api/forum/posts/:id", get(get_post).patch(update_post).delete(delete_post))
        .route("/api/forum/posts/:id/comments", post(add_comment))
        .route("/api/forum/posts/:id/comments/:comment_id", delete(delete_comment))
        .route("/api/forum/posts/:id/upvote", post(toggle_upvote))
        .route("/api/forum/posts/:id/moderate", patch(moderate_post))
}

/// 帖子列表，置顶优先
///
/// GET /api/forum/posts?courseId=&tag=&page=&limit=
/// 无需认证
async fn list_posts(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<PostFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResponse<Page<ForumPostSummary>> {
    ApiResponse::ok(forum::list(&state, &filter, page).await)
}

/// POST /api/forum/posts
async fn create_post(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> ApiResult<ApiResponse<ForumPost>> {
    let post = forum::create(&state, &auth.user, req).await?;
    Ok(ApiResponse::created(post).with_message("Post created"))
}

/// GET /api/forum/posts/:id
async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<ForumPost>> {
    Ok(ApiResponse::ok(forum::get(&state, &id).await?))
}

/// PATCH /api/forum/posts/:id
async fn update_post(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePostRequest>,
) -> ApiResult<ApiResponse<ForumPost>> {
    let post = forum::update(&state, &auth.user, &id, req).await?;
    Ok(ApiResponse::ok(post).with_message("Post updated"))
}

/// DELETE /api/forum/posts/:id
async fn delete_post(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    forum::delete(&state, &auth.user, &id).await?;
    Ok(ApiResponse::message("Post deleted"))
}

/// POST /api/forum/posts/:id/comments
async fn add_comment(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CommentRequest>,
) -> ApiResult<ApiResponse<ForumPost>> {
    let post = forum::add_comment(&state, &auth.user, &id, req).await?;
    Ok(ApiResponse::created(post).with_message("Comment added"))
}

/// DELETE /api/forum/posts/:id/comments/:comment_id
async fn delete_comment(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((id, comment_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<ForumPost>> {
    let post = forum::delete_comment(&state, &auth.user, &id, &comment_id).await?;
    Ok(ApiResponse::ok(post).with_message("Comment deleted"))
}

/// 点赞 / 取消点赞
///
/// POST /api/forum/posts/:id/upvote
async fn toggle_upvote(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<ForumPost>> {
    Ok(ApiResponse::ok(
        forum::toggle_upvote(&state, &auth.user, &id).await?,
    ))
}

/// PATCH /api/forum/posts/:id/moderate
async fn moderate_post(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ModerateRequest>,
) -> ApiResult<ApiResponse<ForumPost>> {
    Ok(ApiResponse::ok(
        forum::moderate(&state, &auth.user, &id, req).await?,
    ))
}
