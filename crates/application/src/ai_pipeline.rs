//! AI 增强管线
//!
//! 语言检测、内容审核与多目标翻译的统一入口，也是唯一的失败兜底边界：
//! AI 服务的任何故障都在这里转换为安全默认值，调用方永远拿到可用结果。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use domain::{LanguageCode, ModerationResult};
use futures_util::future::join_all;

use crate::provider::{AiProvider, ProviderError};
use crate::repository::TranslationCacheRepository;

pub struct AiPipeline {
    provider: Arc<dyn AiProvider>,
    cache: Arc<dyn TranslationCacheRepository>,
    default_language: LanguageCode,
    toxicity_threshold: f64,
}

impl AiPipeline {
    pub fn new(
        provider: Arc<dyn AiProvider>,
        cache: Arc<dyn TranslationCacheRepository>,
        default_language: LanguageCode,
        toxicity_threshold: f64,
    ) -> Self {
        Self {
            provider,
            cache,
            default_language,
            toxicity_threshold,
        }
    }

    pub fn default_language(&self) -> &LanguageCode {
        &self.default_language
    }

    /// 检测文本的源语言；失败时返回兜底语言，绝不向调用方抛错。
    pub async fn detect_language(&self, text: &str) -> LanguageCode {
        match self.provider.detect(text).await {
            Ok(raw) => match LanguageCode::parse(&raw) {
                Ok(code) => code,
                Err(_) => {
                    tracing::warn!(raw = %raw, "language detection returned unusable code");
                    self.default_language.clone()
                }
            },
            Err(err) => {
                self.log_provider_failure("language detection", &err);
                self.default_language.clone()
            }
        }
    }

    /// 审核文本内容；失败时返回不拦截的安全默认值。
    pub async fn moderate_content(&self, text: &str) -> ModerationResult {
        match self.provider.moderate(text).await {
            Ok(outcome) => ModerationResult::from_scores(
                outcome.flagged,
                outcome.category_scores,
                self.toxicity_threshold,
            ),
            Err(err) => {
                self.log_provider_failure("content moderation", &err);
                ModerationResult::benign()
            }
        }
    }

    /// 翻译到目标语言，缓存优先；`source` 为 None 表示源语言未知。
    ///
    /// 任何失败都退回原文。
    pub async fn translate_text(
        &self,
        text: &str,
        target: &LanguageCode,
        source: Option<&LanguageCode>,
    ) -> String {
        // 源语言已知时先查一次缓存，命中即省掉一次检测调用
        if let Some(source) = source {
            if let Some(hit) = self.cached(text, source, target).await {
                return hit;
            }
        }

        let source = match source {
            Some(source) => source.clone(),
            None => {
                let detected = self.detect_language(text).await;
                // 检测出的源语言可能命中先前无法构造的缓存键
                if let Some(hit) = self.cached(text, &detected, target).await {
                    return hit;
                }
                detected
            }
        };

        match self.provider.translate(text, &source, target).await {
            Ok(translated) => {
                // 缓存写入尽力而为，同键重复写入无害
                if let Err(err) = self.cache.put(text, &source, target, &translated).await {
                    tracing::warn!(error = %err, target = %target, "failed to cache translation");
                }
                translated
            }
            Err(err) => {
                self.log_provider_failure("translation", &err);
                text.to_string()
            }
        }
    }

    /// 并发翻译到一组目标语言。
    ///
    /// 与源语言相同的目标直接透传原文；其余目标各自独立失败兜底，
    /// 返回的映射始终每个目标语言恰好一个条目。
    pub async fn translate_for_users(
        &self,
        text: &str,
        source: &LanguageCode,
        targets: HashSet<LanguageCode>,
    ) -> HashMap<LanguageCode, String> {
        let mut translations = HashMap::new();
        let mut pending = Vec::new();

        for target in targets {
            if &target == source {
                translations.insert(target, text.to_string());
            } else {
                pending.push(target);
            }
        }

        let translated = join_all(
            pending
                .iter()
                .map(|target| self.translate_text(text, target, Some(source))),
        )
        .await;

        for (target, translation) in pending.into_iter().zip(translated) {
            translations.insert(target, translation);
        }

        translations
    }

    async fn cached(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Option<String> {
        match self.cache.get(text, source, target).await {
            Ok(hit) => hit,
            Err(err) => {
                // 缓存故障退化为直接调用翻译，不影响结果
                tracing::warn!(error = %err, "translation cache lookup failed");
                None
            }
        }
    }

    fn log_provider_failure(&self, operation: &str, err: &ProviderError) {
        match err {
            ProviderError::Disabled => {
                tracing::debug!(operation, "ai provider disabled, using fallback result");
            }
            _ => {
                tracing::warn!(operation, error = %err, "ai provider call failed, using fallback result");
            }
        }
    }
}
