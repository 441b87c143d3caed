use async_trait::async_trait;
use domain::UserId;
use serde::{Deserialize, Serialize};

use crate::dto::MessageDto;

/// 推送给实时连接的事件，序列化为 `{"event": ..., "data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum RealtimeEvent {
    /// 当前全部在线用户
    #[serde(rename = "getOnlineUsers")]
    OnlineUsers(Vec<UserId>),
    /// 发给接收者的新私信
    #[serde(rename = "newMessage")]
    NewMessage(MessageDto),
}

impl RealtimeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::OnlineUsers(_) => "getOnlineUsers",
            RealtimeEvent::NewMessage(_) => "newMessage",
        }
    }
}

#[async_trait]
pub trait RealtimeDelivery: Send + Sync {
    /// 推送给接收者当前的连接；接收者离线时直接丢弃并返回 false
    async fn deliver(&self, recipient: UserId, event: RealtimeEvent) -> bool;
}
