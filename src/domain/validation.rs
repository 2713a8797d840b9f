//! 字段校验
//!
//! 文档类型的声明式校验规则收集到 `ValidationErrors`，由 error 层转换为 400 响应

use serde::Serialize;
use thiserror::Error;

/// 单个字段错误
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// 校验错误集合
#[derive(Debug, Default, Error)]
#[error("{} validation error(s)", .0.len())]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// 单字段错误的快捷构造
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, message)])
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    /// 条件不成立时记录错误
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.add(field, message);
        }
    }

    /// 必填字符串，检查非空且不超过 `max` 个字符
    pub fn require_text(&mut self, value: &str, field: &str, max: usize) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, format!("{} is required", field));
        } else if trimmed.chars().count() > max {
            self.add(field, format!("{} must be at most {} characters", field, max));
        }
    }

    /// 可选字符串的长度上限
    pub fn max_len(&mut self, value: Option<&str>, field: &str, max: usize) {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.add(field, format!("{} must be at most {} characters", field, max));
            }
        }
    }

    /// 把嵌套对象的错误合并进来，字段名加前缀
    pub fn merge_prefixed(&mut self, prefix: &str, other: ValidationErrors) {
        for e in other.0 {
            self.0.push(FieldError::new(format!("{}.{}", prefix, e.field), e.message));
        }
    }

    /// 合并另一组错误
    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }

    /// 没有错误则 Ok
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        let mut errors = ValidationErrors::new();
        errors.require_text("  ", "title", 10);
        errors.require_text("this is far too long", "name", 10);
        errors.require_text("fine", "ok", 10);
        assert_eq!(errors.errors().len(), 2);
        assert_eq!(errors.errors()[0].message, "title is required");
    }

    #[test]
    fn test_merge_prefixed() {
        let mut outer = ValidationErrors::new();
        outer.merge_prefixed("quiz", ValidationErrors::single("passingScore", "out of range"));
        assert_eq!(outer.errors()[0].field, "quiz.passingScore");
        assert!(outer.finish().is_err());
    }
}
