//! 基础设施层实现。
//!
//! 提供 PostgreSQL 仓储、密码哈希、媒体上传等适配器，实现应用层定义的接口。

pub mod builder;
pub mod media;
pub mod migrations;
pub mod password;
pub mod repository;

pub use builder::{Infrastructure, InfrastructureConfig, InfrastructureError};
pub use media::{HttpMediaStore, InlineMediaStore};
pub use migrations::MIGRATOR;
pub use password::BcryptPasswordHasher;
pub use repository::{create_pg_pool, PgMessageRepository, PgStorage, PgUserRepository};
