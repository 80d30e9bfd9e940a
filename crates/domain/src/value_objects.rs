use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::DomainError;

/// 统一的时间戳类型。
pub type Timestamp = OffsetDateTime;

/// 用户唯一标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<UserId> for Uuid {
    fn from(value: UserId) -> Self {
        value.0
    }
}

/// 聊天室唯一标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub Uuid);

impl RoomId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RoomId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<RoomId> for Uuid {
    fn from(value: RoomId) -> Self {
        value.0
    }
}

/// 消息唯一标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for MessageId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<MessageId> for Uuid {
    fn from(value: MessageId) -> Self {
        value.0
    }
}

/// 实时连接唯一标识，由传输层在连接建立时分配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<ConnectionId> for Uuid {
    fn from(value: ConnectionId) -> Self {
        value.0
    }
}

/// 规范化后的 ISO 639-1 语言代码。
///
/// 外部检测服务偶尔返回超过两个字符的内容，统一小写并截断到两位。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::invalid_argument(
                "language",
                "language code cannot be empty",
            ));
        }
        Ok(Self(normalized.chars().take(2).collect()))
    }

    /// 检测失败时使用的兜底语言。
    pub fn english() -> Self {
        Self("en".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 经过验证的用户名。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// 1-50 个字符，只允许字母数字、空格、下划线和连字符。
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_argument(
                "username",
                "username cannot be empty",
            ));
        }
        if trimmed.chars().count() > 50 {
            return Err(DomainError::invalid_argument(
                "username",
                "username cannot exceed 50 characters",
            ));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_alphanumeric() || c == ' ' || c == '_' || c == '-')
        {
            return Err(DomainError::invalid_argument(
                "username",
                "username may only contain alphanumeric characters, spaces, underscores, or hyphens",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_code_normalization() {
        // 大写与地区后缀都被规范化为两位小写代码
        assert_eq!(LanguageCode::parse("EN").unwrap().as_str(), "en");
        assert_eq!(LanguageCode::parse("zh-CN").unwrap().as_str(), "zh");
        assert_eq!(LanguageCode::parse(" es ").unwrap().as_str(), "es");
        assert!(LanguageCode::parse("   ").is_err());
    }

    #[test]
    fn test_username_rules() {
        assert!(Username::parse("alice").is_ok());
        assert!(Username::parse("alice_bob-99").is_ok());
        assert!(Username::parse("Ana María").is_ok());
        assert!(Username::parse("").is_err());
        assert!(Username::parse("a".repeat(51)).is_err());
        assert!(Username::parse("bad!name").is_err());
    }

    #[test]
    fn test_id_display_roundtrip() {
        let raw = Uuid::new_v4();
        let id = ConnectionId::from(raw);
        assert_eq!(id.to_string(), raw.to_string());
        assert_eq!(Uuid::from(id), raw);
    }
}
