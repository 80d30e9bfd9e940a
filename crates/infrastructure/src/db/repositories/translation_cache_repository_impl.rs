//! 翻译缓存仓储实现
//!
//! 键为（原文、源语言、目标语言）三元组，写一次读多次；
//! 重复写入由 ON CONFLICT DO NOTHING 吸收。

use application::TranslationCacheRepository;
use async_trait::async_trait;
use domain::{LanguageCode, RepositoryError};
use time::OffsetDateTime;

use super::map_sqlx_err;
use crate::db::DbPool;

pub struct PgTranslationCacheRepository {
    pool: DbPool,
}

impl PgTranslationCacheRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TranslationCacheRepository for PgTranslationCacheRepository {
    async fn get(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<Option<String>, RepositoryError> {
        sqlx::query_scalar(
            "SELECT translated_text FROM translation_cache \
             WHERE original_text = $1 AND source_language = $2 AND target_language = $3",
        )
        .bind(text)
        .bind(source.as_str())
        .bind(target.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)
    }

    async fn put(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
        translated: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO translation_cache \
             (original_text, source_language, target_language, translated_text, cached_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (original_text, source_language, target_language) DO NOTHING",
        )
        .bind(text)
        .bind(source.as_str())
        .bind(target.as_str())
        .bind(translated)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }
}
