//! 连接事件路由
//!
//! 把出站事件投递到各连接的发送通道。通道的消费端由传输层持有，
//! 投递失败（对端已关闭）只记日志，绝不影响对其余连接的广播。

use std::collections::HashMap;

use domain::ConnectionId;
use tokio::sync::{mpsc, RwLock};

use crate::events::ServerEvent;

#[derive(Default)]
pub struct EventRouter {
    senders: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) {
        let mut senders = self.senders.write().await;
        senders.insert(connection_id, sender);
    }

    pub async fn unregister(&self, connection_id: ConnectionId) {
        let mut senders = self.senders.write().await;
        senders.remove(&connection_id);
    }

    pub async fn send(&self, connection_id: ConnectionId, event: ServerEvent) {
        let senders = self.senders.read().await;
        match senders.get(&connection_id) {
            Some(sender) => {
                if sender.send(event).is_err() {
                    tracing::warn!(connection_id = %connection_id, "event receiver already closed");
                }
            }
            None => {
                tracing::debug!(connection_id = %connection_id, "no sender registered for connection");
            }
        }
    }

    pub async fn send_to_many(&self, connection_ids: &[ConnectionId], event: ServerEvent) {
        let senders = self.senders.read().await;
        let mut failed = 0usize;

        for connection_id in connection_ids {
            if let Some(sender) = senders.get(connection_id) {
                if sender.send(event.clone()).is_err() {
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            tracing::warn!(failed, "broadcast skipped closed receivers");
        }
    }
}
