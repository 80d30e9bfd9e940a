use std::sync::Arc;

use application::{
    AiPipeline, ChatRoomRepository, ChatService, EventRouter, MessageRepository, RoomRegistry,
    UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ChatService>,
    pub user_service: Arc<UserService>,
    pub registry: Arc<RoomRegistry>,
    pub event_router: Arc<EventRouter>,
    pub ai: Arc<AiPipeline>,
    pub room_repository: Arc<dyn ChatRoomRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
}
