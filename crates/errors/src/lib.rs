//! arc-errors - 统一错误处理
//!
//! 管道内部的错误分类：只有授权级别冲突是致命错误，其余错误都会被记录进结果信封

use std::error::Error as StdError;

use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 同一目标同时声明了 allow-anonymous 和 authorize
    #[error("Ambiguous authorization level: '{target}' declares both allow-anonymous and authorize")]
    AmbiguousAuthorizationLevel { target: String },

    #[error("No handler found for command '{0}'")]
    HandlerNotFound(String),

    #[error("No performer found for query '{0}'")]
    PerformerNotFound(String),

    #[error("Handler failed: {message}")]
    HandlerFailed {
        message: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    /// 调用方在分派前已经取消
    #[error("Operation cancelled")]
    Cancelled,
}

impl AppError {
    pub fn ambiguous_authorization_level(target: impl Into<String>) -> Self {
        Self::AmbiguousAuthorizationLevel {
            target: target.into(),
        }
    }

    pub fn handler_not_found(command: impl Into<String>) -> Self {
        Self::HandlerNotFound(command.into())
    }

    pub fn performer_not_found(query: impl Into<String>) -> Self {
        Self::PerformerNotFound(query.into())
    }

    /// 包装 handler 内部抛出的任意错误，保留 source 链
    pub fn handler_failed<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::HandlerFailed {
            message: message.into(),
            source: Box::new(source),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn external_service(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    /// 致命错误不会被记录进结果，而是直接返回给调用方
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AmbiguousAuthorizationLevel { .. })
    }

    /// 错误的 source 链，每一层一行
    ///
    /// 没有 source 时返回 `None`
    pub fn stack_trace(&self) -> Option<String> {
        let mut lines = Vec::new();
        let mut current = self.source();
        while let Some(err) = current {
            lines.push(format!("caused by: {}", err));
            current = err.source();
        }

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;
