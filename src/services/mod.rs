//! 服务层模块
//!
//! 包含核心业务逻辑，handler 只负责解析请求与包装响应

pub mod assignments;
pub mod auth;
pub mod certificates;
pub mod courses;
pub mod enrollments;
pub mod forum;
pub mod grading;
pub mod learning_paths;
pub mod lessons;
pub mod maintenance;
pub mod modules;
pub mod notifications;
pub mod uploads;
pub mod users;
pub mod wikitext;
