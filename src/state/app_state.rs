//! 应用状态

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::config::EnvConfig;

use super::notification_hub::NotificationHub;
use super::store::Store;

/// 全局 shutdown token，用于优雅关闭所有后台任务
static GLOBAL_SHUTDOWN: std::sync::OnceLock<CancellationToken> = std::sync::OnceLock::new();

/// 获取全局 shutdown token
pub fn get_shutdown_token() -> CancellationToken {
    GLOBAL_SHUTDOWN
        .get_or_init(CancellationToken::new)
        .clone()
}

/// 触发全局 shutdown
pub fn trigger_shutdown() {
    if let Some(token) = GLOBAL_SHUTDOWN.get() {
        token.cancel();
    }
}

/// 应用状态
pub struct AppState {
    /// 环境配置
    pub config: EnvConfig,
    /// 文档存储
    pub store: Store,
    /// 通知推送
    pub notifications: NotificationHub,
    /// 服务启动时间
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// 按配置创建应用状态，配置了数据目录时从快照恢复
    pub async fn new(config: EnvConfig) -> Self {
        let store = match &config.data_dir {
            Some(dir) => Store::open(dir).await,
            None => {
                tracing::warn!("WW_DATA_DIR not set, data will not survive a restart");
                Store::in_memory()
            }
        };

        tracing::info!(
            port = config.port,
            data_dir = ?config.data_dir,
            upload_dir = %config.upload_dir.display(),
            token_ttl_hours = config.token_ttl_hours,
            admin_seed = config.admin.is_some(),
            "Loaded configuration"
        );

        Self::with_store(config, store)
    }

    /// 使用已有存储创建（测试用）
    pub fn with_store(config: EnvConfig, store: Store) -> Self {
        Self {
            config,
            store,
            notifications: NotificationHub::new(),
            started_at: Utc::now(),
        }
    }

    /// 纯内存状态
    pub fn in_memory() -> Self {
        Self::with_store(EnvConfig::in_memory(), Store::in_memory())
    }

    /// 运行时长（秒）
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
