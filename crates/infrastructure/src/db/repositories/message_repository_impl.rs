//! 消息仓储实现
//!
//! 翻译映射与违规分类列表以 JSONB 存储。

use std::collections::HashMap;

use application::MessageRepository;
use async_trait::async_trait;
use domain::{
    LanguageCode, Message, MessageId, RepositoryError, RoomId, UserId, Username,
};
use sqlx::types::Json;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::map_sqlx_err;
use crate::db::DbPool;

/// 数据库消息模型
#[derive(Debug, Clone, FromRow)]
struct MessageRow {
    id: Uuid,
    room_id: Uuid,
    user_id: Uuid,
    username: String,
    original_text: String,
    source_language: String,
    is_flagged: bool,
    toxicity_score: f64,
    flagged_categories: Json<Vec<String>>,
    translations: Json<HashMap<String, String>>,
    created_at: OffsetDateTime,
}

impl TryFrom<MessageRow> for Message {
    type Error = RepositoryError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let translations = row
            .translations
            .0
            .into_iter()
            .map(|(code, text)| {
                LanguageCode::parse(code)
                    .map(|code| (code, text))
                    .map_err(|err| RepositoryError::storage(err.to_string()))
            })
            .collect::<Result<HashMap<LanguageCode, String>, RepositoryError>>()?;

        Ok(Message {
            id: MessageId::from(row.id),
            room_id: RoomId::from(row.room_id),
            user_id: UserId::from(row.user_id),
            username: Username::parse(row.username)
                .map_err(|err| RepositoryError::storage(err.to_string()))?,
            original_text: row.original_text,
            source_language: LanguageCode::parse(row.source_language)
                .map_err(|err| RepositoryError::storage(err.to_string()))?,
            is_flagged: row.is_flagged,
            toxicity_score: row.toxicity_score,
            flagged_categories: row.flagged_categories.0,
            translations,
            created_at: row.created_at,
        })
    }
}

pub struct PgMessageRepository {
    pool: DbPool,
}

impl PgMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn save(&self, message: Message) -> Result<(), RepositoryError> {
        let translations: HashMap<String, String> = message
            .translations
            .iter()
            .map(|(code, text)| (code.as_str().to_string(), text.clone()))
            .collect();

        sqlx::query(
            "INSERT INTO messages \
             (id, room_id, user_id, username, original_text, source_language, \
              is_flagged, toxicity_score, flagged_categories, translations, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.room_id))
        .bind(Uuid::from(message.user_id))
        .bind(message.username.as_str())
        .bind(&message.original_text)
        .bind(message.source_language.as_str())
        .bind(message.is_flagged)
        .bind(message.toxicity_score)
        .bind(Json(&message.flagged_categories))
        .bind(Json(&translations))
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn recent(&self, room_id: RoomId, limit: u32) -> Result<Vec<Message>, RepositoryError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, room_id, user_id, username, original_text, source_language, \
                    is_flagged, toxicity_score, flagged_categories, translations, created_at \
             FROM messages WHERE room_id = $1 \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(Uuid::from(room_id))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        // 查询按时间倒序取最近 limit 条，反转后交付时间升序
        rows.into_iter()
            .rev()
            .map(Message::try_from)
            .collect()
    }
}
