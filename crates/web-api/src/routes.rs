use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use domain::{ChatRoom, LanguageCode, Message, RoomId, UserId, GENERAL_ROOM_NAME};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;
use validator::Validate;

use application::ApplicationError;

use crate::error::ApiError;
use crate::state::AppState;
use crate::websocket;

pub fn router(state: AppState, frontend_origin: &str) -> Router {
    let cors = match frontend_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            tracing::warn!(frontend_origin, "invalid frontend origin, cors stays closed");
            CorsLayer::new()
        }
    };

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(websocket::ws_handler))
        .nest("/api", api_routes())
        .layer(cors)
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/messages/{room}", get(message_history))
        .route("/translate", post(translate))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize, Validate)]
struct LoginPayload {
    #[validate(length(min = 1, max = 50))]
    username: String,
    #[serde(default = "default_language", alias = "language")]
    preferred_language: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    user_id: UserId,
    username: String,
    token: String,
    preferred_language: LanguageCode,
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload
        .validate()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    let user = state
        .user_service
        .login(&payload.username, &payload.preferred_language)
        .await?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username.to_string(),
        token: session_token(),
        preferred_language: user.preferred_language,
    }))
}

/// 登录返回的不透明会话令牌；服务端不保存也不校验。
fn session_token() -> String {
    use rand::{distr::Alphanumeric, Rng};
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(43)
        .map(char::from)
        .collect()
}

#[derive(Debug, Serialize)]
struct RoomsResponse {
    rooms: Vec<ChatRoom>,
}

async fn list_rooms(State(state): State<AppState>) -> Result<Json<RoomsResponse>, ApiError> {
    let mut rooms = state
        .room_repository
        .list()
        .await
        .map_err(ApplicationError::from)?;

    // 一个房间都没有时补出默认房间
    if rooms.is_empty() {
        let general = state
            .room_repository
            .get_or_create(GENERAL_ROOM_NAME)
            .await
            .map_err(ApplicationError::from)?;
        rooms.push(general);
    }

    Ok(Json(RoomsResponse { rooms }))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateRoomPayload {
    #[validate(length(min = 1, max = 50))]
    room_name: String,
}

#[derive(Debug, Serialize)]
struct RoomResponse {
    room: ChatRoom,
}

async fn create_room(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoomPayload>,
) -> Result<(StatusCode, Json<RoomResponse>), ApiError> {
    payload
        .validate()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    let name = payload.room_name.trim();
    if state
        .room_repository
        .find_by_name(name)
        .await
        .map_err(ApplicationError::from)?
        .is_some()
    {
        return Err(ApiError::conflict("Room with this name already exists"));
    }

    let room = ChatRoom::new(RoomId::from(Uuid::new_v4()), name, OffsetDateTime::now_utc())
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    let room = state
        .room_repository
        .create(room)
        .await
        .map_err(ApplicationError::from)?;

    tracing::info!(room_id = %room.id, room_name = %room.name, "room created");
    Ok((StatusCode::CREATED, Json(RoomResponse { room })))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct MessagesResponse {
    messages: Vec<Message>,
    count: usize,
}

async fn message_history(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MessagesResponse>, ApiError> {
    // 历史查询沿用注册表的房间解析规则：id、名字、general 自动创建
    let room = state.registry.resolve_room(&room).await?;
    let limit = query.limit.unwrap_or(50).min(100);

    let messages = state
        .message_repository
        .recent(room.id, limit)
        .await
        .map_err(ApplicationError::from)?;

    Ok(Json(MessagesResponse {
        count: messages.len(),
        messages,
    }))
}

#[derive(Debug, Deserialize)]
struct TranslatePayload {
    text: String,
    #[serde(default = "default_language")]
    target_language: String,
    source_language: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranslateResponse {
    original_text: String,
    translated_text: String,
    source_language: String,
    target_language: String,
}

async fn translate(
    State(state): State<AppState>,
    Json(payload): Json<TranslatePayload>,
) -> Result<Json<TranslateResponse>, ApiError> {
    if payload.text.trim().is_empty() {
        return Err(ApiError::bad_request("Text is required"));
    }

    let target = LanguageCode::parse(&payload.target_language)
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    // "auto" 或缺省表示源语言未知，交给管线先做检测
    let source = match payload.source_language.as_deref() {
        None | Some("auto") => None,
        Some(code) => {
            Some(LanguageCode::parse(code).map_err(|err| ApiError::bad_request(err.to_string()))?)
        }
    };

    let translated = state
        .ai
        .translate_text(&payload.text, &target, source.as_ref())
        .await;

    Ok(Json(TranslateResponse {
        original_text: payload.text,
        translated_text: translated,
        source_language: payload
            .source_language
            .unwrap_or_else(|| "auto".to_string()),
        target_language: target.to_string(),
    }))
}

fn default_language() -> String {
    "en".to_string()
}
