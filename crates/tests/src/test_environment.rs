//! 集成测试环境
//!
//! 在随机端口上启动完整的服务栈：内存存储、事件路由与真实的 Axum 路由。
//! AI 服务由用例注入，可以是停用实现，也可以是打到 wiremock 的真实客户端。

use std::sync::Arc;
use std::time::Duration;

use application::repository::memory::{
    MemoryChatRoomRepository, MemoryMessageRepository, MemoryTranslationCacheRepository,
    MemoryUserRepository,
};
use application::{
    AiPipeline, AiProvider, ChatService, ChatServiceDependencies, Clock, EventRouter,
    RoomRegistry, SlidingWindowRateLimiter, SystemClock, UserService, UserServiceDependencies,
};
use domain::LanguageCode;
use web_api::{router, AppState};

pub struct TestEnvironment {
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
}

impl TestEnvironment {
    /// 组装服务栈并在随机端口上启动。
    pub async fn spawn(provider: Arc<dyn AiProvider>) -> anyhow::Result<Self> {
        let users = Arc::new(MemoryUserRepository::new());
        let rooms = Arc::new(MemoryChatRoomRepository::new());
        let messages = Arc::new(MemoryMessageRepository::new());
        let cache = Arc::new(MemoryTranslationCacheRepository::new());

        let ai = Arc::new(AiPipeline::new(
            provider,
            cache,
            LanguageCode::english(),
            0.7,
        ));
        let registry = Arc::new(RoomRegistry::new(rooms.clone()));
        let event_router = Arc::new(EventRouter::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
            registry: registry.clone(),
            router: event_router.clone(),
            // 配额放宽到用例不会触发限流的程度
            rate_limiter: Arc::new(SlidingWindowRateLimiter::new(100, Duration::from_secs(60))),
            ai: ai.clone(),
            message_repository: messages.clone(),
            clock: clock.clone(),
        }));
        let user_service = Arc::new(UserService::new(UserServiceDependencies {
            user_repository: users,
            clock,
        }));

        let state = AppState {
            chat_service,
            user_service,
            registry,
            event_router,
            ai,
            room_repository: rooms,
            message_repository: messages,
        };

        let app = router(state.clone(), "http://localhost:3000");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                eprintln!("test server stopped: {err}");
            }
        });

        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
            state,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
