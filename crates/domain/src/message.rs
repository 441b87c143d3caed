use crate::errors::DomainError;
use crate::value_objects::{ImageUrl, MessageId, MessageText, Timestamp, UserId};

/// 两个用户之间的私信，创建后不可修改。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub text: Option<MessageText>,
    pub image: Option<ImageUrl>,
    pub created_at: Timestamp,
}

impl Message {
    /// 文本和图片至少要有一个。
    pub fn new(
        id: MessageId,
        sender_id: UserId,
        receiver_id: UserId,
        text: Option<MessageText>,
        image: Option<ImageUrl>,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        if text.is_none() && image.is_none() {
            return Err(DomainError::EmptyMessage);
        }
        Ok(Self {
            id,
            sender_id,
            receiver_id,
            text,
            image,
            created_at,
        })
    }

    /// 消息是否属于两人之间的会话（不区分方向）。
    pub fn is_between(&self, a: UserId, b: UserId) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}
