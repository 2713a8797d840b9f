//! 环境变量配置加载

use std::env;
use std::path::PathBuf;
use tracing::warn;

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// 监听地址
    pub host: String,
    /// 服务监听端口
    pub port: u16,
    /// JSON 快照目录，未设置时仅保存在内存
    pub data_dir: Option<PathBuf>,
    /// 上传文件目录
    pub upload_dir: PathBuf,
    /// 登录 token 有效期（小时）
    pub token_ttl_hours: i64,
    /// 启动时创建的管理员账号
    pub admin: Option<AdminSeed>,
    /// 视频上传上限（字节）
    pub max_video_bytes: usize,
    /// 封面图上传上限（字节）
    pub max_image_bytes: usize,
    /// wikitext 内部链接的目标前缀
    pub wiki_base_url: String,
    /// 日志输出为 JSON
    pub log_json: bool,
}

/// 管理员种子账号
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_or("PORT", 5000);

        let data_dir = env::var("WW_DATA_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let upload_dir = env::var("WW_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let token_ttl_hours = parse_or("WW_TOKEN_TTL_HOURS", 168);

        let admin = match (env::var("WW_ADMIN_EMAIL"), env::var("WW_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminSeed { email, password })
            }
            (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
                warn!("WW_ADMIN_EMAIL and WW_ADMIN_PASSWORD must both be set; skipping admin seed");
                None
            }
            _ => None,
        };

        let max_video_bytes = parse_or::<usize>("WW_MAX_VIDEO_MB", 500) * 1024 * 1024;
        let max_image_bytes = parse_or::<usize>("WW_MAX_IMAGE_MB", 5) * 1024 * 1024;

        let wiki_base_url = env::var("WIKI_BASE_URL")
            .unwrap_or_else(|_| "https://en.wikipedia.org/wiki/".to_string());

        let log_json = Self::log_json_from_env();

        Self {
            host,
            port,
            data_dir,
            upload_dir,
            token_ttl_hours,
            admin,
            max_video_bytes,
            max_image_bytes,
            wiki_base_url,
            log_json,
        }
    }

    /// `LOG_FORMAT=json` 时输出 JSON 日志；日志初始化早于其余配置读取
    pub fn log_json_from_env() -> bool {
        env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }

    /// 内存模式的默认配置（测试与嵌入使用）
    pub fn in_memory() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: None,
            upload_dir: env::temp_dir().join("wikiwalkthrough-uploads"),
            token_ttl_hours: 168,
            admin: None,
            max_video_bytes: 500 * 1024 * 1024,
            max_image_bytes: 5 * 1024 * 1024,
            wiki_base_url: "https://en.wikipedia.org/wiki/".to_string(),
            log_json: false,
        }
    }
}

/// 解析环境变量，缺失或非法时使用默认值
fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            warn!(key = key, value = %v, default = %default, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// 常量
pub mod constants {
    /// 默认分页大小
    pub const DEFAULT_PAGE_SIZE: usize = 20;

    /// 最大分页大小
    pub const MAX_PAGE_SIZE: usize = 100;

    /// 过期会话清理间隔（秒）
    pub const SESSION_CLEANUP_INTERVAL_SECS: u64 = 600;

    /// 密码最小长度
    pub const MIN_PASSWORD_LEN: usize = 8;

    /// 标题最大长度
    pub const MAX_TITLE_LEN: usize = 200;

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or() {
        env::set_var("WW_TEST_PARSE_OK", "42");
        env::set_var("WW_TEST_PARSE_BAD", "forty-two");

        assert_eq!(parse_or("WW_TEST_PARSE_OK", 7u16), 42);
        assert_eq!(parse_or("WW_TEST_PARSE_BAD", 7u16), 7);
        assert_eq!(parse_or("WW_TEST_PARSE_MISSING", 7u16), 7);

        env::remove_var("WW_TEST_PARSE_OK");
        env::remove_var("WW_TEST_PARSE_BAD");
    }

    #[test]
    fn test_in_memory_defaults() {
        let config = EnvConfig::in_memory();
        assert!(config.data_dir.is_none());
        assert_eq!(config.max_image_bytes, 5 * 1024 * 1024);
    }
}
