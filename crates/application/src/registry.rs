//! 房间成员注册表
//!
//! 维护连接与房间之间的双向索引。不变式：连接出现在某房间的成员集合中，
//! 当且仅当该房间在这条连接的已加入集合中；每次变更在同一把写锁内完成
//! 两个方向的更新。房间解析涉及存储访问，总是在取锁之前完成。

use std::collections::{hash_map::Entry, HashMap, HashSet};
use std::sync::Arc;

use domain::{ChatRoom, ConnectionId, DomainError, LanguageCode, RoomId, UserId, Username};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApplicationError;
use crate::repository::ChatRoomRepository;

/// 一条活跃的实时连接。身份字段在首次加入房间时绑定。
#[derive(Debug, Clone)]
pub struct Connection {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub username: Username,
    pub preferred_language: LanguageCode,
    pub joined_rooms: HashSet<RoomId>,
}

/// 加入房间的结果。
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub room: ChatRoom,
    pub username: Username,
    /// 重复加入同一房间时为 false，此时不应重复通知其他成员
    pub newly_joined: bool,
    /// 加入后房间内除自己之外的成员
    pub others: Vec<ConnectionId>,
}

/// 离开房间的结果。
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub username: Username,
    pub was_member: bool,
    /// 离开后仍留在房间内的成员
    pub remaining: Vec<ConnectionId>,
}

/// 断开连接时每个房间产生一条离场记录。
#[derive(Debug, Clone)]
pub struct RoomDeparture {
    pub room_id: RoomId,
    pub username: Username,
    pub remaining: Vec<ConnectionId>,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, Connection>,
    room_members: HashMap<RoomId, HashSet<ConnectionId>>,
}

pub struct RoomRegistry {
    state: RwLock<RegistryState>,
    room_repository: Arc<dyn ChatRoomRepository>,
}

impl RoomRegistry {
    pub fn new(room_repository: Arc<dyn ChatRoomRepository>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            room_repository,
        }
    }

    /// 把一个房间引用解析为具体房间。
    ///
    /// 依次尝试：按 id 查找、按名字查找（大小写不敏感）、
    /// 引用默认房间时自动创建；全部落空则报告房间不存在。
    pub async fn resolve_room(&self, reference: &str) -> Result<ChatRoom, ApplicationError> {
        if let Ok(id) = Uuid::parse_str(reference.trim()) {
            if let Some(room) = self.room_repository.find_by_id(RoomId::from(id)).await? {
                return Ok(room);
            }
        }

        if let Some(room) = self.room_repository.find_by_name(reference.trim()).await? {
            return Ok(room);
        }

        if ChatRoom::is_general_reference(reference) {
            return Ok(self
                .room_repository
                .get_or_create(domain::GENERAL_ROOM_NAME)
                .await?);
        }

        Err(DomainError::room_not_found(reference.trim()).into())
    }

    /// 加入房间：解析引用、upsert 连接记录、双向索引幂等插入。
    ///
    /// 首次加入创建连接记录并绑定身份；重复加入只刷新语言偏好。
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        username: Username,
        room_reference: &str,
        preferred_language: LanguageCode,
    ) -> Result<JoinOutcome, ApplicationError> {
        let room = self.resolve_room(room_reference).await?;

        let mut state = self.state.write().await;
        let state = &mut *state;

        let connection = match state.connections.entry(connection_id) {
            Entry::Occupied(entry) => {
                let connection = entry.into_mut();
                connection.preferred_language = preferred_language;
                connection
            }
            Entry::Vacant(entry) => entry.insert(Connection {
                connection_id,
                user_id,
                username,
                preferred_language,
                joined_rooms: HashSet::new(),
            }),
        };

        let newly_joined = connection.joined_rooms.insert(room.id);
        let username = connection.username.clone();

        let members = state.room_members.entry(room.id).or_default();
        members.insert(connection_id);
        let others = members
            .iter()
            .copied()
            .filter(|id| *id != connection_id)
            .collect();

        Ok(JoinOutcome {
            room,
            username,
            newly_joined,
            others,
        })
    }

    /// 离开房间。连接未知时返回 None；不是成员不算错误。
    pub async fn leave(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> Option<LeaveOutcome> {
        let mut state = self.state.write().await;
        let state = &mut *state;

        let connection = state.connections.get_mut(&connection_id)?;
        let was_member = connection.joined_rooms.remove(&room_id);
        let username = connection.username.clone();

        let remaining = Self::remove_member(&mut state.room_members, room_id, connection_id);

        Some(LeaveOutcome {
            username,
            was_member,
            remaining,
        })
    }

    /// 断开连接：退出所有已加入的房间并丢弃连接记录。
    ///
    /// 从未加入过任何房间的连接也可以安全调用。
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Vec<RoomDeparture> {
        let mut state = self.state.write().await;
        let state = &mut *state;

        let Some(connection) = state.connections.remove(&connection_id) else {
            return Vec::new();
        };

        let mut departures = Vec::new();
        for room_id in connection.joined_rooms {
            let remaining = Self::remove_member(&mut state.room_members, room_id, connection_id);
            departures.push(RoomDeparture {
                room_id,
                username: connection.username.clone(),
                remaining,
            });
        }
        departures
    }

    pub async fn connection(&self, connection_id: ConnectionId) -> Option<Connection> {
        let state = self.state.read().await;
        state.connections.get(&connection_id).cloned()
    }

    pub async fn is_member(&self, connection_id: ConnectionId, room_id: RoomId) -> bool {
        let state = self.state.read().await;
        state
            .room_members
            .get(&room_id)
            .map(|members| members.contains(&connection_id))
            .unwrap_or(false)
    }

    /// 房间当前成员快照。
    pub async fn members_of(&self, room_id: RoomId) -> Vec<ConnectionId> {
        let state = self.state.read().await;
        state
            .room_members
            .get(&room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// 房间当前成员的不重复语言偏好集合。
    pub async fn languages_of(&self, room_id: RoomId) -> HashSet<LanguageCode> {
        let state = self.state.read().await;
        state
            .room_members
            .get(&room_id)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|id| state.connections.get(id))
                    .map(|connection| connection.preferred_language.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 从房间成员集合中移除连接，集合变空时删除键本身。
    fn remove_member(
        room_members: &mut HashMap<RoomId, HashSet<ConnectionId>>,
        room_id: RoomId,
        connection_id: ConnectionId,
    ) -> Vec<ConnectionId> {
        let mut remaining = Vec::new();
        if let Some(members) = room_members.get_mut(&room_id) {
            members.remove(&connection_id);
            if members.is_empty() {
                room_members.remove(&room_id);
            } else {
                remaining = members.iter().copied().collect();
            }
        }
        remaining
    }

    #[cfg(test)]
    async fn assert_bidirectional_index(&self) {
        let state = self.state.read().await;
        for (connection_id, connection) in &state.connections {
            for room_id in &connection.joined_rooms {
                assert!(
                    state
                        .room_members
                        .get(room_id)
                        .is_some_and(|members| members.contains(connection_id)),
                    "connection {connection_id} missing from members of room {room_id}"
                );
            }
        }
        for (room_id, members) in &state.room_members {
            assert!(!members.is_empty(), "room {room_id} kept with empty member set");
            for connection_id in members {
                assert!(
                    state
                        .connections
                        .get(connection_id)
                        .is_some_and(|connection| connection.joined_rooms.contains(room_id)),
                    "room {room_id} lists stale connection {connection_id}"
                );
            }
        }
    }
}
