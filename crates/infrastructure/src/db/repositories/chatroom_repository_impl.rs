//! 聊天室仓储实现

use application::ChatRoomRepository;
use async_trait::async_trait;
use domain::{ChatRoom, RepositoryError, RoomId};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::map_sqlx_err;
use crate::db::DbPool;

/// 数据库房间模型
#[derive(Debug, Clone, FromRow)]
struct RoomRow {
    id: Uuid,
    name: String,
    created_at: OffsetDateTime,
}

impl TryFrom<RoomRow> for ChatRoom {
    type Error = RepositoryError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        ChatRoom::new(RoomId::from(row.id), row.name, row.created_at)
            .map_err(|err| RepositoryError::storage(err.to_string()))
    }
}

pub struct PgChatRoomRepository {
    pool: DbPool,
}

impl PgChatRoomRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRoomRepository for PgChatRoomRepository {
    async fn create(&self, room: ChatRoom) -> Result<ChatRoom, RepositoryError> {
        sqlx::query("INSERT INTO rooms (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(Uuid::from(room.id))
            .bind(&room.name)
            .bind(room.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(room)
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        let row: Option<RoomRow> =
            sqlx::query_as("SELECT id, name, created_at FROM rooms WHERE id = $1")
                .bind(Uuid::from(id))
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        row.map(ChatRoom::try_from).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ChatRoom>, RepositoryError> {
        let row: Option<RoomRow> =
            sqlx::query_as("SELECT id, name, created_at FROM rooms WHERE lower(name) = lower($1)")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        row.map(ChatRoom::try_from).transpose()
    }

    async fn get_or_create(&self, name: &str) -> Result<ChatRoom, RepositoryError> {
        if let Some(room) = self.find_by_name(name).await? {
            return Ok(room);
        }

        // 并发创建同名房间会撞唯一索引，DO NOTHING 后回读既有行
        let inserted: Option<RoomRow> = sqlx::query_as(
            "INSERT INTO rooms (id, name, created_at) VALUES ($1, $2, $3) \
             ON CONFLICT ((lower(name))) DO NOTHING \
             RETURNING id, name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match inserted {
            Some(row) => {
                tracing::info!(room_name = %row.name, "room created");
                row.try_into()
            }
            None => self
                .find_by_name(name)
                .await?
                .ok_or(RepositoryError::NotFound),
        }
    }

    async fn list(&self) -> Result<Vec<ChatRoom>, RepositoryError> {
        let rows: Vec<RoomRow> =
            sqlx::query_as("SELECT id, name, created_at FROM rooms ORDER BY created_at")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        rows.into_iter().map(ChatRoom::try_from).collect()
    }
}
