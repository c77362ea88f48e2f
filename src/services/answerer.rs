//! 问答能力 - 业务能力层
//!
//! 只描述"把一个问题变成一段答案文本"的能力，不关心限流和重试

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

/// 上游错误的结构化类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerErrorKind {
    /// 配额耗尽 / 429
    QuotaExhausted,
    /// 服务暂时不可用 / 503
    Unavailable,
    /// 其他错误，重试无意义
    Other,
}

/// 问答服务返回的错误
///
/// `message` 仅用于诊断和最终的错误答案，重试逻辑只看 `kind`。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AnswerError {
    pub kind: AnswerErrorKind,
    pub message: String,
}

static QUOTA_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RESOURCE_EXHAUSTED|\b429\b").expect("valid regex"));
static UNAVAILABLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b503\b|UNAVAILABLE").expect("valid regex"));

impl AnswerError {
    pub fn new(kind: AnswerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn quota_exhausted(message: impl Into<String>) -> Self {
        Self::new(AnswerErrorKind::QuotaExhausted, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(AnswerErrorKind::Unavailable, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(AnswerErrorKind::Other, message)
    }

    /// 根据上游错误文本推断类别
    ///
    /// 只在上游无法提供结构化状态时使用。
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = if QUOTA_PATTERN.is_match(&message) {
            AnswerErrorKind::QuotaExhausted
        } else if UNAVAILABLE_PATTERN.is_match(&message) {
            AnswerErrorKind::Unavailable
        } else {
            AnswerErrorKind::Other
        };
        Self { kind, message }
    }

    /// 是否属于等待后可能恢复的错误
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            AnswerErrorKind::QuotaExhausted | AnswerErrorKind::Unavailable
        )
    }
}

/// 问答服务
///
/// 由文档 / Agent 子系统提供，可能失败、卡住或被上游限流。
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn ask(&self, query: &str) -> Result<String, AnswerError>;
}
