//! 视频与封面上传
//!
//! 文件按块写入 `upload_dir/<uuid>.<ext>`，超出大小立即中止并删除半成品；
//! 未完成就被丢弃的 `UploadSink`（例如客户端中途断开）在 drop 时删除文件

use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 上传类别
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadKind {
    Video,
    Thumbnail,
}

impl UploadKind {
    /// 允许的 content type 与对应扩展名
    fn allowed(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            UploadKind::Video => &[
                ("video/mp4", "mp4"),
                ("video/webm", "webm"),
                ("video/ogg", "ogv"),
            ],
            UploadKind::Thumbnail => &[
                ("image/jpeg", "jpg"),
                ("image/png", "png"),
                ("image/webp", "webp"),
                ("image/gif", "gif"),
            ],
        }
    }

    pub fn max_bytes(&self, state: &AppState) -> usize {
        match self {
            UploadKind::Video => state.config.max_video_bytes,
            UploadKind::Thumbnail => state.config.max_image_bytes,
        }
    }

    fn extension_for(&self, content_type: &str) -> Option<&'static str> {
        self.allowed()
            .iter()
            .find(|(ct, _)| ct.eq_ignore_ascii_case(content_type))
            .map(|(_, ext)| *ext)
    }
}

/// 上传结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub url: String,
    pub filename: String,
    pub size: usize,
    pub content_type: String,
}

/// 正在写入的上传文件
pub struct UploadSink {
    file: Option<File>,
    path: PathBuf,
    filename: String,
    content_type: String,
    written: usize,
    limit: usize,
    settled: bool,
}

/// 校验类型并创建目标文件
pub async fn begin(state: &AppState, kind: UploadKind, content_type: Option<&str>) -> ApiResult<UploadSink> {
    let content_type = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_lowercase())
        .unwrap_or_default();
    let ext = kind.extension_for(&content_type).ok_or_else(|| {
        let allowed: Vec<&str> = kind.allowed().iter().map(|(ct, _)| *ct).collect();
        ApiError::UnsupportedMediaType(format!(
            "Unsupported file type '{}'; allowed: {}",
            content_type,
            allowed.join(", ")
        ))
    })?;

    let dir = &state.config.upload_dir;
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", dir.display()))?;

    let filename = format!("{}.{}", uuid::Uuid::new_v4(), ext);
    let path = dir.join(&filename);
    let file = File::create(&path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;

    Ok(UploadSink {
        file: Some(file),
        path,
        filename,
        content_type,
        written: 0,
        limit: kind.max_bytes(state),
        settled: false,
    })
}

impl UploadSink {
    /// 写入一块数据；超过上限时删除文件并返回 413
    pub async fn write(&mut self, chunk: &[u8]) -> ApiResult<()> {
        if self.written + chunk.len() > self.limit {
            self.abort().await;
            return Err(ApiError::PayloadTooLarge(format!(
                "File exceeds the maximum size of {} MB",
                self.limit / (1024 * 1024)
            )));
        }

        let Some(file) = self.file.as_mut() else {
            return Err(ApiError::internal("Upload already closed"));
        };
        if let Err(e) = file.write_all(chunk).await {
            self.abort().await;
            return Err(anyhow::Error::new(e).context("Failed to write upload").into());
        }
        self.written += chunk.len();
        Ok(())
    }

    /// 完成写入
    pub async fn finish(mut self) -> ApiResult<UploadedFile> {
        if self.written == 0 {
            self.abort().await;
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }
        if let Some(mut file) = self.file.take() {
            file.flush().await.context("Failed to flush upload")?;
        }
        self.settled = true;

        let filename = std::mem::take(&mut self.filename);
        let content_type = std::mem::take(&mut self.content_type);
        info!(
            filename = %filename,
            size = self.written,
            content_type = %content_type,
            "File uploaded"
        );
        Ok(UploadedFile {
            url: format!("/uploads/{}", filename),
            filename,
            size: self.written,
            content_type,
        })
    }

    /// 丢弃半成品
    pub async fn abort(&mut self) {
        self.file.take();
        self.settled = true;
        if let Err(e) = fs::remove_file(&self.path).await {
            warn!(path = %self.path.display(), error = %e, "Failed to remove partial upload");
        }
    }
}

impl Drop for UploadSink {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.file.take();
        match std::fs::remove_file(&self.path) {
            Ok(()) => warn!(path = %self.path.display(), "Removed interrupted upload"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove interrupted upload"),
        }
    }
}
