mod chatroom_repository_impl;
mod message_repository_impl;
mod translation_cache_repository_impl;
mod user_repository_impl;

pub use chatroom_repository_impl::PgChatRoomRepository;
pub use message_repository_impl::PgMessageRepository;
pub use translation_cache_repository_impl::PgTranslationCacheRepository;
pub use user_repository_impl::PgUserRepository;

use domain::RepositoryError;

pub(crate) fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => RepositoryError::Conflict,
        other => RepositoryError::storage(other.to_string()),
    }
}
