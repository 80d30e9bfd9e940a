//! 主应用程序入口
//!
//! 组装存储、AI 服务与会话协调器，启动 Axum 服务。

use std::sync::Arc;
use std::time::Duration;

use application::{
    repository::memory, AiPipeline, AiProvider, ChatRoomRepository, ChatService,
    ChatServiceDependencies, Clock, DisabledAiProvider, EventRouter, MessageRepository,
    RoomRegistry, SlidingWindowRateLimiter, SystemClock, TranslationCacheRepository,
    UserRepository, UserService, UserServiceDependencies,
};
use config::AppConfig;
use domain::LanguageCode;
use infrastructure::{
    create_pg_pool, OpenAiProvider, PgChatRoomRepository, PgMessageRepository,
    PgTranslationCacheRepository, PgUserRepository,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

struct Repositories {
    users: Arc<dyn UserRepository>,
    rooms: Arc<dyn ChatRoomRepository>,
    messages: Arc<dyn MessageRepository>,
    translation_cache: Arc<dyn TranslationCacheRepository>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env();
    config.validate()?;

    // 存储：优先 PostgreSQL，未配置时退化为内存模式
    let repositories = match &config.database.url {
        Some(url) => {
            tracing::info!("连接数据库: {}", url.split('@').next_back().unwrap_or("unknown"));
            let pool = create_pg_pool(url, config.database.max_connections).await?;

            // 运行迁移
            sqlx::migrate!("../../migrations").run(&pool).await?;

            Repositories {
                users: Arc::new(PgUserRepository::new(pool.clone())),
                rooms: Arc::new(PgChatRoomRepository::new(pool.clone())),
                messages: Arc::new(PgMessageRepository::new(pool.clone())),
                translation_cache: Arc::new(PgTranslationCacheRepository::new(pool)),
            }
        }
        None => {
            tracing::warn!("DATABASE_URL 未设置，消息与缓存仅保存在内存中");
            Repositories {
                users: Arc::new(memory::MemoryUserRepository::new()),
                rooms: Arc::new(memory::MemoryChatRoomRepository::new()),
                messages: Arc::new(memory::MemoryMessageRepository::new()),
                translation_cache: Arc::new(memory::MemoryTranslationCacheRepository::new()),
            }
        }
    };

    // AI 服务：没有 key 时整体停用，检测、翻译与审核都返回兜底结果
    let provider: Arc<dyn AiProvider> = match &config.openai.api_key {
        Some(api_key) => Arc::new(OpenAiProvider::new(
            config.openai.api_base.clone(),
            api_key.clone(),
            config.openai.model.clone(),
        )),
        None => {
            tracing::warn!("OPENAI_API_KEY 未设置，AI 能力停用");
            Arc::new(DisabledAiProvider)
        }
    };

    let default_language = LanguageCode::parse(&config.openai.default_language)
        .map_err(|err| anyhow::anyhow!("invalid DEFAULT_LANGUAGE: {err}"))?;

    let ai = Arc::new(AiPipeline::new(
        provider,
        repositories.translation_cache.clone(),
        default_language,
        config.openai.toxicity_threshold,
    ));
    let rate_limiter = Arc::new(SlidingWindowRateLimiter::new(
        config.rate_limit.max_messages,
        Duration::from_secs(config.rate_limit.window_secs),
    ));
    let registry = Arc::new(RoomRegistry::new(repositories.rooms.clone()));
    let event_router = Arc::new(EventRouter::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
        registry: registry.clone(),
        router: event_router.clone(),
        rate_limiter,
        ai: ai.clone(),
        message_repository: repositories.messages.clone(),
        clock: clock.clone(),
    }));
    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: repositories.users.clone(),
        clock,
    }));

    let state = AppState {
        chat_service,
        user_service,
        registry,
        event_router,
        ai,
        room_repository: repositories.rooms,
        message_repository: repositories.messages,
    };

    // 启动 Web 服务器
    let app = router(state, &config.server.frontend_origin);
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;

    tracing::info!(
        "聊天服务器启动在 http://{}:{}",
        config.server.host,
        config.server.port
    );
    axum::serve(listener, app).await?;

    Ok(())
}
