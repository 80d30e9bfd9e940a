use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{RoomId, Timestamp};

/// 被引用但不存在时会自动创建的默认房间名。
pub const GENERAL_ROOM_NAME: &str = "general";

/// 聊天室实体。房间只增不删，名字大小写不敏感唯一。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: RoomId,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
}

impl ChatRoom {
    pub fn new(
        id: RoomId,
        name: impl Into<String>,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let name = Self::validate_name(name.into())?;
        Ok(Self {
            id,
            name,
            created_at,
        })
    }

    /// 判断一个房间引用是否指向默认房间。
    pub fn is_general_reference(reference: &str) -> bool {
        reference.trim().eq_ignore_ascii_case(GENERAL_ROOM_NAME)
    }

    fn validate_name(name: String) -> Result<String, DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_argument(
                "room_name",
                "room name cannot be empty",
            ));
        }
        if trimmed.chars().count() > 50 {
            return Err(DomainError::invalid_argument(
                "room_name",
                "room name cannot exceed 50 characters",
            ));
        }
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn test_room_name_validation() {
        let id = RoomId::from(Uuid::new_v4());
        let now = OffsetDateTime::now_utc();

        let room = ChatRoom::new(id, "  rust 中文房  ", now).unwrap();
        assert_eq!(room.name, "rust 中文房");

        assert!(ChatRoom::new(id, "", now).is_err());
        assert!(ChatRoom::new(id, "   ", now).is_err());
        assert!(ChatRoom::new(id, "x".repeat(51), now).is_err());
    }

    #[test]
    fn test_general_reference_is_case_insensitive() {
        assert!(ChatRoom::is_general_reference("general"));
        assert!(ChatRoom::is_general_reference("General"));
        assert!(ChatRoom::is_general_reference(" GENERAL "));
        assert!(!ChatRoom::is_general_reference("generally"));
        assert!(!ChatRoom::is_general_reference("lobby"));
    }
}
