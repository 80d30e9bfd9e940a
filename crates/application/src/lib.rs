//! 应用层实现。
//!
//! 围绕领域模型的用例服务：房间成员注册表、消息处理管线、AI 增强，
//! 以及对外部协作方（存储、AI 服务）的抽象。

pub mod ai_pipeline;
pub mod chat_service;
pub mod clock;
pub mod error;
pub mod events;
pub mod provider;
pub mod rate_limiter;
pub mod registry;
pub mod repository;
pub mod router;
pub mod user_service;

pub use ai_pipeline::AiPipeline;
pub use chat_service::{ChatService, ChatServiceDependencies, JoinRoomRequest};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ApplicationError;
pub use events::ServerEvent;
pub use provider::{AiProvider, DisabledAiProvider, ProviderError, ProviderModeration};
pub use rate_limiter::{RateLimitError, SlidingWindowRateLimiter};
pub use registry::{Connection, JoinOutcome, LeaveOutcome, RoomDeparture, RoomRegistry};
pub use repository::{
    ChatRoomRepository, MessageRepository, TranslationCacheRepository, UserRepository,
};
pub use router::EventRouter;
pub use user_service::{UserService, UserServiceDependencies};
