//! WebSocket 传输层
//!
//! 每条连接拆成独立的发送与接收任务：发送任务消费事件路由的通道并
//! 序列化为文本帧，接收任务解析客户端事件分发给会话协调器。任一方向
//! 结束即视为连接关闭，清理恰好执行一次。

use application::{JoinRoomRequest, ServerEvent};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use domain::{ConnectionId, LanguageCode, RoomId, UserId, Username, GENERAL_ROOM_NAME};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::state::AppState;

/// 客户端入站事件。
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ClientEvent {
    JoinRoom {
        user_id: Uuid,
        username: String,
        /// 房间 id 或名字，缺省进默认房间
        #[serde(default = "default_room", alias = "room_id", alias = "room_name")]
        room: String,
        #[serde(default = "default_language")]
        preferred_language: String,
    },
    LeaveRoom {
        room_id: Uuid,
    },
    SendMessage {
        room_id: Uuid,
        text: String,
    },
    UserTyping {
        room_id: Uuid,
        is_typing: bool,
    },
}

fn default_room() -> String {
    GENERAL_ROOM_NAME.to_string()
}

fn default_language() -> String {
    "en".to_string()
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::from(Uuid::new_v4());
    tracing::info!(connection_id = %connection_id, "websocket connected");

    let (mut sender, mut incoming) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    state.event_router.register(connection_id, tx).await;
    state
        .event_router
        .send(connection_id, ServerEvent::Connected { connection_id })
        .await;

    // 发送任务：把路由过来的事件序列化成文本帧
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to serialize outbound event");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // 接收任务：解析客户端事件并分发给会话协调器
    let recv_state = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = incoming.next().await {
            match frame {
                WsMessage::Text(text) => {
                    dispatch_client_event(&recv_state, connection_id, text.as_str()).await;
                }
                WsMessage::Close(_) => break,
                WsMessage::Binary(_) => {
                    tracing::debug!(connection_id = %connection_id, "binary frames are not supported");
                }
                // ping/pong 由协议栈自动应答
                WsMessage::Ping(_) | WsMessage::Pong(_) => {}
            }
        }
    });

    // 任一方向结束即认为连接关闭
    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }

    state.event_router.unregister(connection_id).await;
    state.chat_service.disconnect(connection_id).await;
    tracing::info!(connection_id = %connection_id, "websocket cleaned up");
}

async fn dispatch_client_event(state: &AppState, connection_id: ConnectionId, raw: &str) {
    let event: ClientEvent = match serde_json::from_str(raw) {
        Ok(event) => event,
        Err(err) => {
            tracing::debug!(connection_id = %connection_id, error = %err, "malformed client event");
            state
                .event_router
                .send(connection_id, ServerEvent::error("Invalid event payload"))
                .await;
            return;
        }
    };

    match event {
        ClientEvent::JoinRoom {
            user_id,
            username,
            room,
            preferred_language,
        } => {
            let username = match Username::parse(username) {
                Ok(username) => username,
                Err(err) => {
                    state
                        .event_router
                        .send(connection_id, ServerEvent::error(err.to_string()))
                        .await;
                    return;
                }
            };
            // 语言代码无法解析时退回默认语言，不拒绝加入
            let preferred_language = LanguageCode::parse(&preferred_language)
                .unwrap_or_else(|_| LanguageCode::english());

            state
                .chat_service
                .join_room(
                    connection_id,
                    JoinRoomRequest {
                        user_id: UserId::from(user_id),
                        username,
                        room,
                        preferred_language,
                    },
                )
                .await;
        }
        ClientEvent::LeaveRoom { room_id } => {
            state
                .chat_service
                .leave_room(connection_id, RoomId::from(room_id))
                .await;
        }
        ClientEvent::SendMessage { room_id, text } => {
            state
                .chat_service
                .send_message(connection_id, RoomId::from(room_id), &text)
                .await;
        }
        ClientEvent::UserTyping { room_id, is_typing } => {
            state
                .chat_service
                .typing_indicator(connection_id, RoomId::from(room_id), is_typing)
                .await;
        }
    }
}
