use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{LanguageCode, MessageId, RoomId, Timestamp, UserId, Username};

/// 一次内容审核的结论。
///
/// `toxicity_score` 取所有分类得分的最大值；单项得分达到阈值的分类
/// 记入 `flagged_categories`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub is_flagged: bool,
    pub toxicity_score: f64,
    pub categories: HashMap<String, f64>,
    pub flagged_categories: Vec<String>,
}

impl ModerationResult {
    /// 审核服务不可用时的安全默认值，绝不拦截消息。
    pub fn benign() -> Self {
        Self {
            is_flagged: false,
            toxicity_score: 0.0,
            categories: HashMap::new(),
            flagged_categories: Vec::new(),
        }
    }

    /// 由服务返回的分类得分计算审核结论。
    ///
    /// 服务自身的 flagged 标记与最大得分达到阈值二者任一成立即判定违规。
    pub fn from_scores(
        provider_flagged: bool,
        category_scores: HashMap<String, f64>,
        threshold: f64,
    ) -> Self {
        let toxicity_score = category_scores
            .values()
            .copied()
            .fold(0.0_f64, f64::max);

        let mut flagged_categories: Vec<String> = category_scores
            .iter()
            .filter(|(_, score)| **score >= threshold)
            .map(|(category, _)| category.clone())
            .collect();
        // 输出顺序与 HashMap 的遍历顺序解耦
        flagged_categories.sort();

        Self {
            is_flagged: provider_flagged || toxicity_score >= threshold,
            toxicity_score,
            categories: category_scores,
            flagged_categories,
        }
    }
}

/// 持久化消息，只追加，不修改不删除。
///
/// 广播前已携带全部增强结果：源语言、审核结论和按语言的翻译映射。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub username: Username,
    pub original_text: String,
    pub source_language: LanguageCode,
    pub is_flagged: bool,
    pub toxicity_score: f64,
    pub flagged_categories: Vec<String>,
    pub translations: HashMap<LanguageCode, String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
}

impl Message {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: MessageId,
        room_id: RoomId,
        user_id: UserId,
        username: Username,
        original_text: impl Into<String>,
        source_language: LanguageCode,
        moderation: ModerationResult,
        translations: HashMap<LanguageCode, String>,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let original_text = original_text.into();
        if original_text.trim().is_empty() {
            return Err(DomainError::EmptyMessage);
        }
        Ok(Self {
            id,
            room_id,
            user_id,
            username,
            original_text,
            source_language,
            is_flagged: moderation.is_flagged,
            toxicity_score: moderation.toxicity_score,
            flagged_categories: moderation.flagged_categories,
            translations,
            created_at,
        })
    }
}
