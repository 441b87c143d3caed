//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，处理输入校验、在线状态登记、
//! 实时投递，以及对外部适配器（例如密码哈希、媒体上传）的抽象。

pub mod broadcaster;
pub mod clock;
pub mod dto;
pub mod error;
pub mod local_broadcast;
pub mod media;
pub mod memory;
pub mod password;
pub mod presence;
pub mod repository;
pub mod services;

pub use broadcaster::{RealtimeDelivery, RealtimeEvent};
pub use clock::{Clock, SystemClock};
pub use dto::{MessageDto, UserProfileDto};
pub use error::ApplicationError;
pub use local_broadcast::{EventReceiver, RealtimeHub};
pub use media::{MediaError, MediaStore};
pub use password::{PasswordHasher, PasswordHasherError};
pub use presence::{ConnectionContext, ConnectionId, PresenceRegistry};
pub use repository::{MessageRepository, UserRepository};
pub use services::{
    LoginRequest, MessageService, MessageServiceDependencies, SendMessageRequest, SignupRequest,
    UserService, UserServiceDependencies,
};
