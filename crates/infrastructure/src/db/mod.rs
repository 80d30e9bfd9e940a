//! 数据库连接与仓储实现

pub mod repositories;

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// 创建 PostgreSQL 连接池。
pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
