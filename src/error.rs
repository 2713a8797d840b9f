//! 统一错误处理
//!
//! `ApiError` 实现 `IntoResponse`，统一输出 `{success:false, message, errors}` 错误信封；
//! `ApiResponse` 是对应的成功信封 `{success, message, data}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::validation::{FieldError, ValidationErrors};
use crate::state::StoreError;

/// API 错误响应结构
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub errors: Vec<FieldError>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = errors;
        self
    }
}

/// 统一 API 错误类型
#[derive(Debug)]
pub enum ApiError {
    /// 401 - 未认证（token 无效、过期或缺失）
    Unauthorized(String),
    /// 403 - 无权限（角色不符或非资源所有者）
    Forbidden(String),
    /// 404 - 资源未找到
    NotFound(String),
    /// 400 - 请求无效
    BadRequest(String),
    /// 400 - 字段校验失败
    Validation(Vec<FieldError>),
    /// 409 - 冲突（唯一索引）
    Conflict(String),
    /// 413 - 上传文件过大
    PayloadTooLarge(String),
    /// 415 - 不支持的文件类型
    UnsupportedMediaType(String),
    /// 500 - 内部错误
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// 创建未找到错误，`resource` 形如 "Course 'abc'"
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// 对应的 HTTP 状态码
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::NotFound(resource) => ErrorResponse::new(format!("{} not found", resource)),
            ApiError::Validation(errors) => {
                ErrorResponse::new("Validation failed").with_errors(errors)
            }
            ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::UnsupportedMediaType(msg)
            | ApiError::Internal(msg) => ErrorResponse::new(msg),
        };

        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthorized(m) => write!(f, "Unauthorized: {}", m),
            ApiError::Forbidden(m) => write!(f, "Forbidden: {}", m),
            ApiError::NotFound(r) => write!(f, "Not found: {}", r),
            ApiError::BadRequest(m) => write!(f, "Bad request: {}", m),
            ApiError::Validation(errors) => write!(f, "Validation failed: {} field(s)", errors.len()),
            ApiError::Conflict(m) => write!(f, "Conflict: {}", m),
            ApiError::PayloadTooLarge(m) => write!(f, "Payload too large: {}", m),
            ApiError::UnsupportedMediaType(m) => write!(f, "Unsupported media type: {}", m),
            ApiError::Internal(m) => write!(f, "Internal error: {}", m),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors.into_inner())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "Unexpected failure");
        ApiError::Internal("Internal server error".to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Io(e) => e.into(),
        }
    }
}

/// 便捷类型别名
pub type ApiResult<T> = Result<T, ApiError>;

/// 成功响应信封
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    status: StatusCode,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 + 数据
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: "OK".to_string(),
            data: Some(data),
        }
    }

    /// 201 + 新建的资源
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            success: true,
            message: "Created".to_string(),
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl ApiResponse<()> {
    /// 仅消息，无数据
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_new() {
        let resp = ErrorResponse::new("Test message");
        assert!(!resp.success);
        assert_eq!(resp.message, "Test message");
        assert!(resp.errors.is_empty());
    }

    #[test]
    fn test_error_envelope_always_has_errors() {
        let json = serde_json::to_value(ErrorResponse::new("Course not found")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["errors"], serde_json::json!([]));
    }

    #[test]
    fn test_error_response_serializes_field_errors() {
        let resp = ErrorResponse::new("Validation failed")
            .with_errors(vec![FieldError::new("title", "Title is required")]);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["errors"][0]["field"], "title");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Validation(vec![]).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::PayloadTooLarge("x".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_success_envelope() {
        let resp = ApiResponse::created(serde_json::json!({"id": "1"}));
        assert_eq!(resp.status, StatusCode::CREATED);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["id"], "1");
        assert!(json.get("status").is_none());

        let msg = serde_json::to_value(ApiResponse::message("done")).unwrap();
        assert!(msg.get("data").is_none());
    }
}
