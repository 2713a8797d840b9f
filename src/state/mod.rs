//! 运行时状态模块
//!
//! 管理应用状态、文档存储和通知推送通道

pub mod app_state;
pub mod notification_hub;
pub mod store;

pub use app_state::{get_shutdown_token, trigger_shutdown, AppState};
pub use notification_hub::NotificationHub;
pub use store::{Collection, Document, Store, StoreError};
