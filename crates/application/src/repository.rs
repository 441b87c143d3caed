use async_trait::async_trait;
use domain::{Message, RepositoryError, User, UserEmail, UserId};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 邮箱重复时返回 `RepositoryError::Conflict`
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError>;
    /// 除指定用户外的所有用户，按用户名排序
    async fn list_except(&self, id: UserId) -> Result<Vec<User>, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError>;

    // 两个用户之间的全部私信，按创建时间倒序
    async fn list_between(&self, a: UserId, b: UserId) -> Result<Vec<Message>, RepositoryError>;
}
