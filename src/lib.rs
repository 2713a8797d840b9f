//! WikiWalkthrough - Wikipedia 编辑学习平台后端
//!
//! 课程、课时、测验、作业、证书、学习路径、通知与论坛的 REST API

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::EnvConfig;
use crate::state::{trigger_shutdown, AppState};

/// 命令行覆盖项
#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    /// 覆盖 PORT
    pub port_override: Option<u16>,
    /// 覆盖 WW_DATA_DIR
    pub data_dir_override: Option<PathBuf>,
}

/// 初始化日志
///
/// 默认级别由 RUST_LOG 控制，`json` 为真时输出结构化 JSON
pub fn init_tracing<W>(json: bool, writer: W)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wikiwalkthrough=info,tower_http=info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(fmt::layer().json().with_writer(writer)).try_init()
    } else {
        registry.with(fmt::layer().with_writer(writer)).try_init()
    };
    if let Err(e) = result {
        eprintln!("Tracing already initialized: {}", e);
    }
}

/// 初始化日志后读取环境配置并应用命令行覆盖
pub fn load_config<W>(runtime: RuntimeConfig, writer: W) -> EnvConfig
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    dotenvy::dotenv().ok();
    init_tracing(EnvConfig::log_json_from_env(), writer);

    let mut config = EnvConfig::from_env();
    if let Some(port) = runtime.port_override {
        config.port = port;
    }
    if let Some(dir) = runtime.data_dir_override {
        config.data_dir = Some(dir);
    }
    config
}

/// 加载配置、恢复数据并启动 HTTP 服务，直到收到 Ctrl+C
pub async fn run_with_config(runtime: RuntimeConfig) -> anyhow::Result<()> {
    let config = load_config(runtime, std::io::stdout);
    tracing::info!(version = config::env::constants::VERSION, "Starting WikiWalkthrough");

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config).await);

    services::auth::seed_admin(&state)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to seed admin account: {}", e))?;

    tokio::spawn(services::maintenance::start(state.clone()));

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Shutdown signal received");
    trigger_shutdown();
}
