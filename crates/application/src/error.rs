use domain::{DomainError, RepositoryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    pub fn internal(message: impl Into<String>) -> Self {
        ApplicationError::Internal(message.into())
    }

    /// 面向用户的错误文本。
    ///
    /// 输入类错误下发具体原因，其余一律使用调用方给定的兜底文案，
    /// 避免把内部细节泄露给客户端。
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApplicationError::Domain(err) => err.to_string(),
            _ => fallback.to_string(),
        }
    }
}
