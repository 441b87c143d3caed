//! 私信聊天系统核心领域模型
//!
//! 包含用户、私信等核心实体，以及相关的值对象和错误类型。

pub mod errors;
pub mod message;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use errors::{DomainError, RepositoryError};
pub use message::Message;
pub use user::User;
pub use value_objects::{
    ImageUrl, MessageId, MessageText, PasswordHash, Timestamp, UserEmail, UserId, Username,
};
