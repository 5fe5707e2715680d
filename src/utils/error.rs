use crate::domain::model::OrderId;
use thiserror::Error;

/// 系統運行異常
pub const SYSTEM_EXCEPTION: i32 = 1;

/// 核心模組異常
pub const CORE_MODULE_ERROR: i32 = 100;

#[derive(Error, Debug)]
pub enum OmsError {
    #[error("Permission denied by {verifier}: {reason}")]
    PermissionDenied { verifier: String, reason: String },

    #[error("Repository error: {message}")]
    RepositoryError { message: String },

    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: OrderId },

    #[error("Handler {handler} failed: {message}")]
    HandlerError { handler: String, message: String },

    #[error("Pooled task {task} failed: {reason}")]
    TaskFailed { task: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

impl OmsError {
    pub fn handler(handler: impl Into<String>, message: impl Into<String>) -> Self {
        OmsError::HandlerError {
            handler: handler.into(),
            message: message.into(),
        }
    }

    pub fn repository(message: impl Into<String>) -> Self {
        OmsError::RepositoryError {
            message: message.into(),
        }
    }

    /// 錯誤碼：業務相關為核心模組異常，其餘為系統異常
    pub fn code(&self) -> i32 {
        match self {
            OmsError::PermissionDenied { .. }
            | OmsError::OrderNotFound { .. }
            | OmsError::HandlerError { .. } => CORE_MODULE_ERROR,
            _ => SYSTEM_EXCEPTION,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OmsError::RepositoryError { .. } | OmsError::TaskFailed { .. } | OmsError::IoError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OmsError>;
