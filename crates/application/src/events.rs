//! 出站事件定义
//!
//! 事件名与字段构成对客户端的线上契约，变更需同步前端。

use std::collections::HashMap;

use domain::{ConnectionId, LanguageCode, Message, MessageId, RoomId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// 服务器推送给客户端的事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// 连接建立确认
    Connected { connection_id: ConnectionId },
    /// 加入房间成功（发给加入者本人）
    JoinedRoom {
        room_id: RoomId,
        room_name: String,
        username: String,
    },
    /// 有人加入房间（发给其他成员）
    UserJoined {
        username: String,
        room_id: RoomId,
        room_name: String,
    },
    /// 离开房间确认（发给离开者本人）
    LeftRoom { room_id: RoomId },
    /// 有人离开房间（发给其他成员）
    UserLeft { username: String, room_id: RoomId },
    /// 完整增强后的消息（发给房间内所有成员，包括发送者）
    ReceiveMessage {
        message_id: MessageId,
        user_id: UserId,
        username: String,
        room_id: RoomId,
        original_text: String,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: Timestamp,
        is_flagged: bool,
        toxicity_score: f64,
        flagged_categories: Vec<String>,
        translations: HashMap<LanguageCode, String>,
        source_language: LanguageCode,
    },
    /// 输入状态指示（发给其他成员）
    UserTyping {
        username: String,
        room_id: RoomId,
        is_typing: bool,
    },
    /// 错误提示（只发给事件发起者）
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn receive_message(message: &Message) -> Self {
        Self::ReceiveMessage {
            message_id: message.id,
            user_id: message.user_id,
            username: message.username.to_string(),
            room_id: message.room_id,
            original_text: message.original_text.clone(),
            timestamp: message.created_at,
            is_flagged: message.is_flagged,
            toxicity_score: message.toxicity_score,
            flagged_categories: message.flagged_categories.clone(),
            translations: message.translations.clone(),
            source_language: message.source_language.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_event_wire_names_are_snake_case() {
        let room_id = RoomId::from(Uuid::new_v4());
        let event = ServerEvent::JoinedRoom {
            room_id,
            room_name: "general".to_string(),
            username: "alice".to_string(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "joined_room");
        assert_eq!(value["room_name"], "general");
        assert_eq!(value["room_id"], room_id.to_string());
    }

    #[test]
    fn test_receive_message_payload_shape() {
        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            RoomId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            domain::Username::parse("alice").unwrap(),
            "hola",
            LanguageCode::parse("es").unwrap(),
            domain::ModerationResult::benign(),
            HashMap::from([(LanguageCode::parse("en").unwrap(), "hello".to_string())]),
            time::macros::datetime!(2025-06-01 12:00:00 UTC),
        )
        .unwrap();

        let value = serde_json::to_value(ServerEvent::receive_message(&message)).unwrap();
        assert_eq!(value["event"], "receive_message");
        assert_eq!(value["original_text"], "hola");
        assert_eq!(value["source_language"], "es");
        assert_eq!(value["translations"]["en"], "hello");
        assert_eq!(value["is_flagged"], false);
        // 时间戳序列化为 RFC 3339 文本
        assert_eq!(value["timestamp"], "2025-06-01T12:00:00Z");
    }
}
