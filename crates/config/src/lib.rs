//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 服务监听与前端来源
//! - 数据库连接（可缺省，缺省时退化为内存模式）
//! - AI 服务（可缺省，缺省时翻译与审核返回兜底结果）
//! - 消息限流

use serde::{Deserialize, Serialize};
use std::env;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// AI 服务配置
    pub openai: OpenAiConfig,
    /// 限流配置
    pub rate_limit: RateLimitConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 允许的前端来源（CORS）
    pub frontend_origin: String,
}

/// 数据库配置
///
/// `url` 为空表示存储不可用，服务以内存模式运行。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

/// AI 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// 未设置时 AI 能力整体停用，管线退回安全默认值
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    /// 单项审核得分达到该值即判定违规
    pub toxicity_threshold: f64,
    /// 语言检测失败时的兜底语言
    pub default_language: String,
}

/// 限流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// 滑动窗口内允许的最大消息数
    pub max_messages: u32,
    /// 窗口长度（秒）
    pub window_secs: u64,
}

impl AppConfig {
    /// 从环境变量加载配置。
    ///
    /// 所有键都有默认值；DATABASE_URL 与 OPENAI_API_KEY 缺省是合法的降级
    /// 运行模式，不在这里报错。
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8080),
                frontend_origin: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            },
            openai: OpenAiConfig {
                api_key: env::var("OPENAI_API_KEY").ok(),
                api_base: env::var("OPENAI_API_BASE")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
                toxicity_threshold: env::var("TOXICITY_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0.7),
                default_language: env::var("DEFAULT_LANGUAGE")
                    .unwrap_or_else(|_| "en".to_string()),
            },
            rate_limit: RateLimitConfig {
                max_messages: env::var("RATE_LIMIT_MESSAGES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                window_secs: env::var("RATE_LIMIT_WINDOW")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            },
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.openai.toxicity_threshold) {
            return Err(ConfigError::InvalidAiConfig(
                "toxicity threshold must be within [0, 1]".to_string(),
            ));
        }

        if self.openai.default_language.trim().is_empty() {
            return Err(ConfigError::InvalidAiConfig(
                "default language cannot be empty".to_string(),
            ));
        }

        if self.rate_limit.max_messages == 0 {
            return Err(ConfigError::InvalidRateLimitConfig(
                "rate limit must allow at least one message".to_string(),
            ));
        }

        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::InvalidRateLimitConfig(
                "rate limit window must be greater than 0".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidDatabaseConfig(
                "max connections must be greater than 0".to_string(),
            ));
        }

        if self.server.frontend_origin.trim().is_empty() {
            return Err(ConfigError::InvalidServerConfig(
                "frontend origin cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server configuration: {0}")]
    InvalidServerConfig(String),
    #[error("Invalid database configuration: {0}")]
    InvalidDatabaseConfig(String),
    #[error("Invalid AI configuration: {0}")]
    InvalidAiConfig(String),
    #[error("Invalid rate limit configuration: {0}")]
    InvalidRateLimitConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                frontend_origin: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
            },
            openai: OpenAiConfig {
                api_key: None,
                api_base: "https://api.openai.com/v1".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                toxicity_threshold: 0.7,
                default_language: "en".to_string(),
            },
            rate_limit: RateLimitConfig {
                max_messages: 10,
                window_secs: 60,
            },
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        // 没有任何环境变量时的降级配置也应通过校验
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut config = base_config();
        config.openai.toxicity_threshold = 1.5;
        assert!(config.validate().is_err());

        config.openai.toxicity_threshold = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let mut config = base_config();
        config.rate_limit.max_messages = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.rate_limit.window_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_frontend_origin_rejected() {
        let mut config = base_config();
        config.server.frontend_origin = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
