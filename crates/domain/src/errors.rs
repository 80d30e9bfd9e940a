//! 领域错误定义
//!
//! 输入类错误的 Display 文本即面向用户的提示语，会被会话协调器原样下发。

use thiserror::Error;

/// 领域错误类型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("Not authenticated. Please join a room first.")]
    NotAuthenticated,

    #[error("Message text cannot be empty")]
    EmptyMessage,

    #[error("You are not in this room")]
    NotInRoom,

    #[error("Room \"{reference}\" not found")]
    RoomNotFound { reference: String },

    #[error("Room with this name already exists")]
    RoomAlreadyExists,

    #[error("User not found")]
    UserNotFound,
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn room_not_found(reference: impl Into<String>) -> Self {
        Self::RoomNotFound {
            reference: reference.into(),
        }
    }
}

/// 存储层错误类型
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("resource not found")]
    NotFound,
    #[error("resource conflict")]
    Conflict,
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
