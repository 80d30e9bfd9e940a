use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use domain::UserId;

/// 限流错误类型
///
/// Display 文本会被原样下发给触发限流的用户。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded. Please wait {retry_after_secs} seconds.")]
    Exceeded { retry_after_secs: u64 },
}

/// 滑动窗口消息限流器
///
/// 为每个用户维护窗口内已接受消息的时间戳序列；从未出现过的用户
/// 首次调用必然通过。
pub struct SlidingWindowRateLimiter {
    max_messages: u32,
    window: Duration,
    history: RwLock<HashMap<UserId, VecDeque<Instant>>>,
}

impl SlidingWindowRateLimiter {
    pub fn new(max_messages: u32, window: Duration) -> Self {
        Self {
            max_messages,
            window,
            history: RwLock::new(HashMap::new()),
        }
    }

    /// 检查用户是否允许发送，允许时记录本次时间戳。
    pub fn check(&self, user_id: UserId) -> Result<(), RateLimitError> {
        let now = Instant::now();
        let mut history = self
            .history
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let timestamps = history.entry(user_id).or_default();

        // 丢弃已滑出窗口的记录
        while let Some(oldest) = timestamps.front() {
            if now.duration_since(*oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.max_messages as usize {
            if let Some(oldest) = timestamps.front() {
                let retry_after = self.window.saturating_sub(now.duration_since(*oldest));
                return Err(RateLimitError::Exceeded {
                    retry_after_secs: retry_after.as_secs().max(1),
                });
            }
        }

        timestamps.push_back(now);
        Ok(())
    }

    /// 清空某个用户的限流历史（管理操作，消息管线本身不调用）。
    pub fn reset(&self, user_id: UserId) {
        let mut history = self
            .history
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        history.remove(&user_id);
    }
}
