//! 上传 API
//!
//! 包含 /api/uploads/{video,thumbnail} 端点，multipart 字段名为 `file`

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Router,
};
use std::sync::Arc;

use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::services::uploads::{self, UploadKind, UploadedFile};
use crate::state::AppState;

/// multipart 边界与表头的额外余量
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// 请求体上限取视频上限，封面的上限在写入时检查
pub fn router(max_video_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/uploads/video", post(upload_video))
        .route("/api/uploads/thumbnail", post(upload_thumbnail))
        .layer(DefaultBodyLimit::max(max_video_bytes + MULTIPART_OVERHEAD))
}

/// POST /api/uploads/video
async fn upload_video(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<ApiResponse<UploadedFile>> {
    auth.require_author()?;
    let file = receive(&state, UploadKind::Video, multipart).await?;
    Ok(ApiResponse::created(file).with_message("Video uploaded"))
}

/// POST /api/uploads/thumbnail
async fn upload_thumbnail(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<ApiResponse<UploadedFile>> {
    auth.require_author()?;
    let file = receive(&state, UploadKind::Thumbnail, multipart).await?;
    Ok(ApiResponse::created(file).with_message("Thumbnail uploaded"))
}

/// 找到 `file` 字段并按块写盘
async fn receive(state: &AppState, kind: UploadKind, mut multipart: Multipart) -> ApiResult<UploadedFile> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let mut sink = uploads::begin(state, kind, field.content_type()).await?;
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => sink.write(&chunk).await?,
                Ok(None) => break,
                Err(e) => {
                    sink.abort().await;
                    return Err(multipart_error(e));
                }
            }
        }
        return sink.finish().await;
    }

    Err(ApiError::bad_request("Missing multipart field 'file'"))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::bad_request(e.body_text())
    }
}
