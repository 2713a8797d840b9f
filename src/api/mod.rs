//! API 模块
//!
//! HTTP handlers 和路由组装

pub mod extract;
pub mod openapi;

pub mod assignments;
pub mod auth;
pub mod certificates;
pub mod courses;
pub mod enrollments;
pub mod forum;
pub mod health;
pub mod learning_paths;
pub mod lessons;
pub mod modules;
pub mod notifications;
pub mod uploads;
pub mod users;
pub mod wikitext;

use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::state::AppState;

/// 构建完整的 API 路由
pub fn router(state: Arc<AppState>) -> Router {
    let uploads_dir = ServeDir::new(&state.config.upload_dir);

    Router::new()
        // Health & Docs
        .merge(health::router())
        // Accounts
        .merge(auth::router())
        .merge(users::router())
        // Catalog
        .merge(courses::router())
        .merge(modules::router())
        .merge(lessons::router())
        // Learning
        .merge(enrollments::router())
        .merge(assignments::router())
        .merge(certificates::router())
        .merge(learning_paths::router())
        // Community
        .merge(notifications::router())
        .merge(forum::router())
        .merge(wikitext::router())
        // Media
        .merge(uploads::router(state.config.max_video_bytes))
        .nest_service("/uploads", uploads_dir)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
