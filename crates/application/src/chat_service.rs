//! 会话协调器
//!
//! 所有入站实时事件（加入、离开、断开、发送、输入指示）的统一入口：
//! 读写成员注册表、驱动 AI 管线、持久化并广播，出站事件经事件路由投递。

use std::sync::Arc;

use domain::{ConnectionId, DomainError, LanguageCode, Message, MessageId, RoomId, UserId, Username};
use uuid::Uuid;

use crate::ai_pipeline::AiPipeline;
use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::events::ServerEvent;
use crate::rate_limiter::SlidingWindowRateLimiter;
use crate::registry::{Connection, RoomRegistry};
use crate::repository::MessageRepository;
use crate::router::EventRouter;

/// 加入房间请求。字符串字段已在传输层完成解析。
#[derive(Debug, Clone)]
pub struct JoinRoomRequest {
    pub user_id: UserId,
    pub username: Username,
    /// 房间 id 或名字
    pub room: String,
    pub preferred_language: LanguageCode,
}

pub struct ChatServiceDependencies {
    pub registry: Arc<RoomRegistry>,
    pub router: Arc<EventRouter>,
    pub rate_limiter: Arc<SlidingWindowRateLimiter>,
    pub ai: Arc<AiPipeline>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn join_room(&self, connection_id: ConnectionId, request: JoinRoomRequest) {
        let result = self
            .deps
            .registry
            .join(
                connection_id,
                request.user_id,
                request.username,
                &request.room,
                request.preferred_language,
            )
            .await;

        match result {
            Ok(outcome) => {
                tracing::info!(
                    connection_id = %connection_id,
                    room_id = %outcome.room.id,
                    room_name = %outcome.room.name,
                    username = %outcome.username,
                    "user joined room"
                );

                self.deps
                    .router
                    .send(
                        connection_id,
                        ServerEvent::JoinedRoom {
                            room_id: outcome.room.id,
                            room_name: outcome.room.name.clone(),
                            username: outcome.username.to_string(),
                        },
                    )
                    .await;

                // 重复加入不再打扰其他成员
                if outcome.newly_joined && !outcome.others.is_empty() {
                    self.deps
                        .router
                        .send_to_many(
                            &outcome.others,
                            ServerEvent::UserJoined {
                                username: outcome.username.to_string(),
                                room_id: outcome.room.id,
                                room_name: outcome.room.name,
                            },
                        )
                        .await;
                }
            }
            Err(err) => {
                tracing::warn!(connection_id = %connection_id, error = %err, "join room failed");
                self.emit_error(connection_id, err.user_message("Failed to join room"))
                    .await;
            }
        }
    }

    pub async fn leave_room(&self, connection_id: ConnectionId, room_id: RoomId) {
        let Some(outcome) = self.deps.registry.leave(connection_id, room_id).await else {
            return;
        };

        tracing::info!(
            connection_id = %connection_id,
            room_id = %room_id,
            username = %outcome.username,
            "user left room"
        );

        self.deps
            .router
            .send(connection_id, ServerEvent::LeftRoom { room_id })
            .await;

        if !outcome.remaining.is_empty() {
            self.deps
                .router
                .send_to_many(
                    &outcome.remaining,
                    ServerEvent::UserLeft {
                        username: outcome.username.to_string(),
                        room_id,
                    },
                )
                .await;
        }
    }

    /// 断开连接：对每个已加入的房间补发一次离场通知，然后丢弃连接记录。
    pub async fn disconnect(&self, connection_id: ConnectionId) {
        let departures = self.deps.registry.disconnect(connection_id).await;
        for departure in departures {
            if !departure.remaining.is_empty() {
                self.deps
                    .router
                    .send_to_many(
                        &departure.remaining,
                        ServerEvent::UserLeft {
                            username: departure.username.to_string(),
                            room_id: departure.room_id,
                        },
                    )
                    .await;
            }
        }
        tracing::info!(connection_id = %connection_id, "connection state cleaned up");
    }

    /// 消息处理管线：校验 → 限流 → AI 增强 → 持久化 → 广播。
    ///
    /// 前四步的失败下发具体原因；之后的意外失败统一收敛为一条
    /// 通用错误，注册表状态不受影响。
    pub async fn send_message(&self, connection_id: ConnectionId, room_id: RoomId, text: &str) {
        let Some(connection) = self.deps.registry.connection(connection_id).await else {
            self.emit_error(connection_id, DomainError::NotAuthenticated.to_string())
                .await;
            return;
        };

        // 空文本在限流之前拒绝，不消耗配额
        let text = text.trim();
        if text.is_empty() {
            self.emit_error(connection_id, DomainError::EmptyMessage.to_string())
                .await;
            return;
        }

        if let Err(err) = self.deps.rate_limiter.check(connection.user_id) {
            self.emit_error(connection_id, err.to_string()).await;
            return;
        }

        if !connection.joined_rooms.contains(&room_id) {
            self.emit_error(connection_id, DomainError::NotInRoom.to_string())
                .await;
            return;
        }

        if let Err(err) = self.process_message(&connection, room_id, text).await {
            tracing::error!(
                error = %err,
                connection_id = %connection_id,
                user_id = %connection.user_id,
                room_id = %room_id,
                "message pipeline failed"
            );
            self.emit_error(connection_id, "Failed to send message").await;
        }
    }

    /// 管线 5-9 步。注册表的锁从不跨越 AI 调用持有，这里只做快照读。
    async fn process_message(
        &self,
        connection: &Connection,
        room_id: RoomId,
        text: &str,
    ) -> Result<(), ApplicationError> {
        // 语言检测与内容审核相互独立，并发执行
        let (source_language, moderation) = tokio::join!(
            self.deps.ai.detect_language(text),
            self.deps.ai.moderate_content(text),
        );

        let mut target_languages = self.deps.registry.languages_of(room_id).await;
        if target_languages.is_empty() {
            // 与并发断开竞争时房间可能已无成员，退回默认语言
            target_languages.insert(self.deps.ai.default_language().clone());
        }

        let translations = self
            .deps
            .ai
            .translate_for_users(text, &source_language, target_languages)
            .await;

        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            room_id,
            connection.user_id,
            connection.username.clone(),
            text,
            source_language,
            moderation,
            translations,
            self.deps.clock.now(),
        )?;

        // 持久化尽力而为：存储故障降级为只广播不落盘
        if let Err(err) = self.deps.message_repository.save(message.clone()).await {
            tracing::warn!(
                error = %err,
                room_id = %room_id,
                user_id = %message.user_id,
                "message broadcast without durable record"
            );
        }

        // 广播给当前快照下的所有成员，包括发送者自己
        let members = self.deps.registry.members_of(room_id).await;
        self.deps
            .router
            .send_to_many(&members, ServerEvent::receive_message(&message))
            .await;

        tracing::info!(
            room_id = %room_id,
            user_id = %message.user_id,
            message_id = %message.id,
            "message sent"
        );
        Ok(())
    }

    /// 输入状态指示：非成员静默忽略，从不持久化也从不限流。
    pub async fn typing_indicator(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        is_typing: bool,
    ) {
        let Some(connection) = self.deps.registry.connection(connection_id).await else {
            return;
        };
        if !connection.joined_rooms.contains(&room_id) {
            return;
        }

        let others: Vec<ConnectionId> = self
            .deps
            .registry
            .members_of(room_id)
            .await
            .into_iter()
            .filter(|id| *id != connection_id)
            .collect();
        if others.is_empty() {
            return;
        }

        self.deps
            .router
            .send_to_many(
                &others,
                ServerEvent::UserTyping {
                    username: connection.username.to_string(),
                    room_id,
                    is_typing,
                },
            )
            .await;
    }

    async fn emit_error(&self, connection_id: ConnectionId, message: impl Into<String>) {
        self.deps
            .router
            .send(connection_id, ServerEvent::error(message))
            .await;
    }
}
