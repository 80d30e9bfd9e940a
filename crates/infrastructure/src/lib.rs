//! 基础设施层
//!
//! 应用层抽象的具体落地：PostgreSQL 仓储和 OpenAI 兼容的 AI 服务客户端。

pub mod db;
pub mod openai;

pub use db::repositories::{
    PgChatRoomRepository, PgMessageRepository, PgTranslationCacheRepository, PgUserRepository,
};
pub use db::{create_pg_pool, DbPool};
pub use openai::OpenAiProvider;
