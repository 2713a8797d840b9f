//! WikiWalkthrough 服务入口
//!
//! Usage:
//! - Normal mode: `wikiwalkthrough`
//! - With custom port: `wikiwalkthrough --port 8080`
//! - With persistent data: `wikiwalkthrough --data-dir ./data`

use std::path::PathBuf;
use wikiwalkthrough::RuntimeConfig;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                i += 2;
            }
            "--data-dir" if i + 1 < args.len() => {
                config.data_dir_override = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("WikiWalkthrough - Wikipedia 编辑学习平台后端");
    println!();
    println!("USAGE:");
    println!("    wikiwalkthrough [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>        Override the listening port");
    println!("    --data-dir <DIR>     Persist collections as JSON snapshots in DIR");
    println!("    -h, --help           Print help information");
    println!();
    println!("ENVIRONMENT:");
    println!("    HOST, PORT, WW_DATA_DIR, WW_UPLOAD_DIR, WW_TOKEN_TTL_HOURS,");
    println!("    WW_ADMIN_EMAIL, WW_ADMIN_PASSWORD, WW_MAX_VIDEO_MB, WW_MAX_IMAGE_MB,");
    println!("    WIKI_BASE_URL, LOG_FORMAT, RUST_LOG");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = parse_args();
    wikiwalkthrough::run_with_config(config).await
}
