use std::{collections::HashMap, fmt};

use domain::UserId;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 实时连接唯一标识，每次握手生成一个新的
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 握手时确定的连接上下文，断开时据此清理在线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionContext {
    pub connection_id: ConnectionId,
    /// 客户端未声明 userId 时为 None
    pub user_id: Option<UserId>,
}

/// 在线状态登记表
///
/// 每个用户最多对应一个活动连接，重复连接时以最后一次为准。
/// 进程内共享，所有读写都经过内部锁。
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: RwLock<HashMap<UserId, ConnectionId>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记连接，覆盖该用户之前的连接；返回被替换的连接
    pub async fn on_connect(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Option<ConnectionId> {
        let mut entries = self.entries.write().await;
        entries.insert(user_id, connection_id)
    }

    /// 连接关闭时调用，只有登记项仍指向该连接才会移除；返回是否移除
    pub async fn on_disconnect(&self, context: &ConnectionContext) -> bool {
        let Some(user_id) = context.user_id else {
            return false;
        };

        let mut entries = self.entries.write().await;
        match entries.get(&user_id) {
            Some(current) if *current == context.connection_id => {
                entries.remove(&user_id);
                true
            }
            _ => false,
        }
    }

    pub async fn lookup(&self, user_id: UserId) -> Option<ConnectionId> {
        self.entries.read().await.get(&user_id).copied()
    }

    /// 当前在线用户快照，排序后返回以保证广播内容稳定
    pub async fn online_users(&self) -> Vec<UserId> {
        let entries = self.entries.read().await;
        let mut users: Vec<UserId> = entries.keys().copied().collect();
        users.sort();
        users
    }
}
