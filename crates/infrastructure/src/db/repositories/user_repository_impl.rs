//! 用户仓储实现

use application::UserRepository;
use async_trait::async_trait;
use domain::{LanguageCode, RepositoryError, User, UserId, Username};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::map_sqlx_err;
use crate::db::DbPool;

/// 数据库用户模型
#[derive(Debug, Clone, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    preferred_language: String,
    created_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User::new(
            UserId::from(row.id),
            Username::parse(row.username)
                .map_err(|err| RepositoryError::storage(err.to_string()))?,
            LanguageCode::parse(row.preferred_language)
                .map_err(|err| RepositoryError::storage(err.to_string()))?,
            row.created_at,
        ))
    }
}

pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        sqlx::query(
            "INSERT INTO users (id, username, preferred_language, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(user.preferred_language.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, preferred_language, created_at FROM users WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, preferred_language, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(User::try_from).transpose()
    }

    async fn update_language(
        &self,
        id: UserId,
        language: &LanguageCode,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET preferred_language = $2 WHERE id = $1")
            .bind(Uuid::from(id))
            .bind(language.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
