use async_trait::async_trait;
use domain::{ChatRoom, LanguageCode, Message, RepositoryError, RoomId, User, UserId};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
    async fn update_language(
        &self,
        id: UserId,
        language: &LanguageCode,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ChatRoomRepository: Send + Sync {
    async fn create(&self, room: ChatRoom) -> Result<ChatRoom, RepositoryError>;
    async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError>;
    /// 名字匹配大小写不敏感。
    async fn find_by_name(&self, name: &str) -> Result<Option<ChatRoom>, RepositoryError>;
    async fn get_or_create(&self, name: &str) -> Result<ChatRoom, RepositoryError>;
    async fn list(&self) -> Result<Vec<ChatRoom>, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    // 消息只追加；id 和时间戳由调用方生成
    async fn save(&self, message: Message) -> Result<(), RepositoryError>;

    // 返回按时间升序排列的最近 limit 条消息
    async fn recent(&self, room_id: RoomId, limit: u32) -> Result<Vec<Message>, RepositoryError>;
}

#[async_trait]
pub trait TranslationCacheRepository: Send + Sync {
    async fn get(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<Option<String>, RepositoryError>;

    // 同键重复写入必须无害
    async fn put(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
        translated: &str,
    ) -> Result<(), RepositoryError>;
}

/// 内存实现（用于测试，以及数据库未配置时的降级运行模式）
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use time::OffsetDateTime;
    use tokio::sync::RwLock;
    use uuid::Uuid;

    #[derive(Default)]
    pub struct MemoryUserRepository {
        users: RwLock<HashMap<UserId, User>>,
    }

    impl MemoryUserRepository {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl UserRepository for MemoryUserRepository {
        async fn create(&self, user: User) -> Result<User, RepositoryError> {
            let mut users = self.users.write().await;
            if users
                .values()
                .any(|existing| existing.username == user.username)
            {
                return Err(RepositoryError::Conflict);
            }
            users.insert(user.id, user.clone());
            Ok(user)
        }

        async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
            let users = self.users.read().await;
            Ok(users.get(&id).cloned())
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
            let users = self.users.read().await;
            Ok(users
                .values()
                .find(|user| user.username.as_str() == username)
                .cloned())
        }

        async fn update_language(
            &self,
            id: UserId,
            language: &LanguageCode,
        ) -> Result<(), RepositoryError> {
            let mut users = self.users.write().await;
            let user = users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            user.update_language(language.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct MemoryChatRoomRepository {
        rooms: RwLock<HashMap<RoomId, ChatRoom>>,
    }

    impl MemoryChatRoomRepository {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl ChatRoomRepository for MemoryChatRoomRepository {
        async fn create(&self, room: ChatRoom) -> Result<ChatRoom, RepositoryError> {
            let mut rooms = self.rooms.write().await;
            if rooms
                .values()
                .any(|existing| existing.name.eq_ignore_ascii_case(&room.name))
            {
                return Err(RepositoryError::Conflict);
            }
            rooms.insert(room.id, room.clone());
            Ok(room)
        }

        async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError> {
            let rooms = self.rooms.read().await;
            Ok(rooms.get(&id).cloned())
        }

        async fn find_by_name(&self, name: &str) -> Result<Option<ChatRoom>, RepositoryError> {
            let rooms = self.rooms.read().await;
            Ok(rooms
                .values()
                .find(|room| room.name.eq_ignore_ascii_case(name))
                .cloned())
        }

        async fn get_or_create(&self, name: &str) -> Result<ChatRoom, RepositoryError> {
            // 查找和创建持同一把写锁，避免并发下建出重名房间
            let mut rooms = self.rooms.write().await;
            if let Some(room) = rooms
                .values()
                .find(|room| room.name.eq_ignore_ascii_case(name))
            {
                return Ok(room.clone());
            }
            let room = ChatRoom::new(
                RoomId::from(Uuid::new_v4()),
                name,
                OffsetDateTime::now_utc(),
            )
            .map_err(|err| RepositoryError::storage(err.to_string()))?;
            rooms.insert(room.id, room.clone());
            Ok(room)
        }

        async fn list(&self) -> Result<Vec<ChatRoom>, RepositoryError> {
            let rooms = self.rooms.read().await;
            let mut rooms: Vec<ChatRoom> = rooms.values().cloned().collect();
            rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(rooms)
        }
    }

    #[derive(Default)]
    pub struct MemoryMessageRepository {
        messages: RwLock<Vec<Message>>,
    }

    impl MemoryMessageRepository {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl MessageRepository for MemoryMessageRepository {
        async fn save(&self, message: Message) -> Result<(), RepositoryError> {
            let mut messages = self.messages.write().await;
            messages.push(message);
            Ok(())
        }

        async fn recent(
            &self,
            room_id: RoomId,
            limit: u32,
        ) -> Result<Vec<Message>, RepositoryError> {
            let messages = self.messages.read().await;
            let mut selected: Vec<Message> = messages
                .iter()
                .filter(|message| message.room_id == room_id)
                .cloned()
                .collect();
            selected.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            let skip = selected.len().saturating_sub(limit as usize);
            Ok(selected.split_off(skip))
        }
    }

    #[derive(Default)]
    pub struct MemoryTranslationCacheRepository {
        entries: RwLock<HashMap<(String, String, String), String>>,
    }

    impl MemoryTranslationCacheRepository {
        pub fn new() -> Self {
            Self::default()
        }

        fn key(text: &str, source: &LanguageCode, target: &LanguageCode) -> (String, String, String) {
            (
                text.to_string(),
                source.as_str().to_string(),
                target.as_str().to_string(),
            )
        }
    }

    #[async_trait]
    impl TranslationCacheRepository for MemoryTranslationCacheRepository {
        async fn get(
            &self,
            text: &str,
            source: &LanguageCode,
            target: &LanguageCode,
        ) -> Result<Option<String>, RepositoryError> {
            let entries = self.entries.read().await;
            Ok(entries.get(&Self::key(text, source, target)).cloned())
        }

        async fn put(
            &self,
            text: &str,
            source: &LanguageCode,
            target: &LanguageCode,
            translated: &str,
        ) -> Result<(), RepositoryError> {
            let mut entries = self.entries.write().await;
            entries
                .entry(Self::key(text, source, target))
                .or_insert_with(|| translated.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::*;
    use super::*;
    use domain::{LanguageCode, Username};
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_room_lookup_is_case_insensitive() {
        let repository = MemoryChatRoomRepository::new();
        let room = repository.get_or_create("General").await.unwrap();

        let found = repository.find_by_name("gEnErAl").await.unwrap().unwrap();
        assert_eq!(found.id, room.id);

        // 同名重建返回既有房间
        let again = repository.get_or_create("GENERAL").await.unwrap();
        assert_eq!(again.id, room.id);
        assert_eq!(repository.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_room_create_conflicts() {
        let repository = MemoryChatRoomRepository::new();
        repository.get_or_create("rust").await.unwrap();

        let duplicate = ChatRoom::new(
            RoomId::from(Uuid::new_v4()),
            "RUST",
            OffsetDateTime::now_utc(),
        )
        .unwrap();
        assert!(matches!(
            repository.create(duplicate).await,
            Err(RepositoryError::Conflict)
        ));
    }

    #[tokio::test]
    async fn test_recent_messages_are_chronological_and_bounded() {
        let repository = MemoryMessageRepository::new();
        let room_id = RoomId::from(Uuid::new_v4());
        let user_id = UserId::from(Uuid::new_v4());
        let base = OffsetDateTime::now_utc();

        for i in 0..5_i64 {
            let message = Message::new(
                domain::MessageId::from(Uuid::new_v4()),
                room_id,
                user_id,
                Username::parse("alice").unwrap(),
                format!("msg {i}"),
                LanguageCode::english(),
                domain::ModerationResult::benign(),
                Default::default(),
                base + time::Duration::seconds(i),
            )
            .unwrap();
            repository.save(message).await.unwrap();
        }

        let recent = repository.recent(room_id, 3).await.unwrap();
        let texts: Vec<&str> = recent.iter().map(|m| m.original_text.as_str()).collect();
        assert_eq!(texts, vec!["msg 2", "msg 3", "msg 4"]);
    }

    #[tokio::test]
    async fn test_translation_cache_roundtrip_and_idempotent_put() {
        let cache = MemoryTranslationCacheRepository::new();
        let source = LanguageCode::parse("es").unwrap();
        let target = LanguageCode::parse("en").unwrap();

        assert!(cache.get("hola", &source, &target).await.unwrap().is_none());

        cache.put("hola", &source, &target, "hello").await.unwrap();
        // 重复写入不覆盖已有条目
        cache.put("hola", &source, &target, "hi").await.unwrap();

        assert_eq!(
            cache.get("hola", &source, &target).await.unwrap().as_deref(),
            Some("hello")
        );
    }
}
