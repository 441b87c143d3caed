// 进程内实时投递中心
use std::collections::HashMap;

use async_trait::async_trait;
use domain::UserId;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    RwLock,
};

use crate::{
    broadcaster::{RealtimeDelivery, RealtimeEvent},
    presence::{ConnectionContext, ConnectionId, PresenceRegistry},
};

pub type EventReceiver = mpsc::Receiver<RealtimeEvent>;

/// 每个连接最多积压的事件数
pub const DEFAULT_CONNECTION_BUFFER: usize = 64;

type Connections = HashMap<ConnectionId, mpsc::Sender<RealtimeEvent>>;

/// 持有所有实时连接的发送端，并维护在线状态登记表。
///
/// 匿名连接（握手未带 userId）也会收到在线列表广播，但不会出现在列表中。
/// 在线状态的变更和随后的广播都在 `connections` 写锁内完成，
/// 所以每个连接收到的在线列表按变更顺序到达。
/// 队列写满的连接会被摘除，写端随之结束并走正常的关闭流程。
pub struct RealtimeHub {
    presence: PresenceRegistry,
    connections: RwLock<Connections>,
    buffer: usize,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::with_buffer(DEFAULT_CONNECTION_BUFFER)
    }
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            presence: PresenceRegistry::default(),
            connections: RwLock::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// 注册新连接并广播在线列表
    pub async fn open(&self, user_id: Option<UserId>) -> (ConnectionContext, EventReceiver) {
        let context = ConnectionContext {
            connection_id: ConnectionId::generate(),
            user_id,
        };
        let (sender, receiver) = mpsc::channel(self.buffer);

        let mut connections = self.connections.write().await;
        connections.insert(context.connection_id, sender);

        if let Some(user_id) = user_id {
            if let Some(replaced) = self.presence.on_connect(user_id, context.connection_id).await
            {
                tracing::info!(
                    user_id = %user_id,
                    replaced = %replaced,
                    connection_id = %context.connection_id,
                    "user reconnected, previous connection no longer receives messages"
                );
            }
        }

        self.broadcast_locked(&mut connections).await;
        (context, receiver)
    }

    /// 连接关闭；只有真正移除了在线项才广播
    pub async fn close(&self, context: &ConnectionContext) {
        let mut connections = self.connections.write().await;
        connections.remove(&context.connection_id);

        if self.presence.on_disconnect(context).await {
            self.broadcast_locked(&mut connections).await;
        }
    }

    /// 把完整在线列表推给所有连接，返回成功推送的连接数
    pub async fn broadcast_presence(&self) -> usize {
        let mut connections = self.connections.write().await;
        self.broadcast_locked(&mut connections).await
    }

    async fn broadcast_locked(&self, connections: &mut Connections) -> usize {
        let online = self.presence.online_users().await;

        let mut sent = 0;
        connections.retain(|connection_id, sender| {
            match sender.try_send(RealtimeEvent::OnlineUsers(online.clone())) {
                Ok(()) => {
                    sent += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(connection_id = %connection_id, "event queue full, dropping connection");
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(connection_id = %connection_id, "connection writer already gone");
                    true
                }
            }
        });
        sent
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[async_trait]
impl RealtimeDelivery for RealtimeHub {
    async fn deliver(&self, recipient: UserId, event: RealtimeEvent) -> bool {
        let Some(connection_id) = self.presence.lookup(recipient).await else {
            tracing::debug!(recipient = %recipient, event = event.name(), "recipient offline, event dropped");
            return false;
        };

        let connections = self.connections.read().await;
        let Some(sender) = connections.get(&connection_id) else {
            return false;
        };
        match sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                drop(connections);
                tracing::warn!(
                    recipient = %recipient,
                    connection_id = %connection_id,
                    event = event.name(),
                    "event queue full, dropping connection"
                );
                self.connections.write().await.remove(&connection_id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}
