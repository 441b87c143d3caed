use async_trait::async_trait;
use domain::{value_objects::MAX_PASSWORD_BYTES, PasswordHash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordHasherError {
    /// 超长密码会被 bcrypt 截断，哈希前直接拒绝
    #[error("password is {len} bytes, at most {MAX_PASSWORD_BYTES} allowed")]
    TooLong { len: usize },
    #[error("hash error: {0}")]
    Hash(String),
    #[error("verify error: {0}")]
    Verify(String),
}

impl PasswordHasherError {
    pub fn hash_error(message: impl Into<String>) -> Self {
        Self::Hash(message.into())
    }

    pub fn verify_error(message: impl Into<String>) -> Self {
        Self::Verify(message.into())
    }
}

/// 明文是否在哈希算法能完整处理的长度内
pub fn ensure_hashable(plaintext: &str) -> Result<(), PasswordHasherError> {
    match plaintext.len() {
        len if len > MAX_PASSWORD_BYTES => Err(PasswordHasherError::TooLong { len }),
        _ => Ok(()),
    }
}

/// 密码哈希接口。
///
/// `hash` 对超过 [`MAX_PASSWORD_BYTES`] 的明文返回 `TooLong`；
/// `verify` 对这类明文一律返回 `Ok(false)`，不会与任何已存哈希匹配。
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError>;
    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError>;
}
