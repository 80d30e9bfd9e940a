use serde::{Deserialize, Serialize};

use crate::value_objects::{LanguageCode, Timestamp, UserId, Username};

/// 持久化用户。登录时按用户名 upsert，语言偏好随登录刷新。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub preferred_language: LanguageCode,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
}

impl User {
    pub fn new(
        id: UserId,
        username: Username,
        preferred_language: LanguageCode,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            username,
            preferred_language,
            created_at,
        }
    }

    pub fn update_language(&mut self, language: LanguageCode) {
        self.preferred_language = language;
    }
}
