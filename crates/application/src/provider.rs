use std::collections::HashMap;

use async_trait::async_trait;
use domain::LanguageCode;
use thiserror::Error;

/// AI 服务调用错误
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
    #[error("ai provider is not configured")]
    Disabled,
}

/// 审核服务的原始返回：服务自身的判定标记加各分类得分。
#[derive(Debug, Clone, Default)]
pub struct ProviderModeration {
    pub flagged: bool,
    pub category_scores: HashMap<String, f64>,
}

/// 外部 AI 能力：语言检测、内容审核、翻译。
///
/// 实现方只负责如实上报失败，兜底策略统一由 [`crate::AiPipeline`] 处理。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn detect(&self, text: &str) -> Result<String, ProviderError>;

    async fn moderate(&self, text: &str) -> Result<ProviderModeration, ProviderError>;

    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, ProviderError>;
}

/// 未配置 API key 时使用的空实现，所有调用返回 [`ProviderError::Disabled`]。
pub struct DisabledAiProvider;

#[async_trait]
impl AiProvider for DisabledAiProvider {
    async fn detect(&self, _text: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Disabled)
    }

    async fn moderate(&self, _text: &str) -> Result<ProviderModeration, ProviderError> {
        Err(ProviderError::Disabled)
    }

    async fn translate(
        &self,
        _text: &str,
        _source: &LanguageCode,
        _target: &LanguageCode,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::Disabled)
    }
}
