use application::{
    password::{ensure_hashable, PasswordHasherError},
    PasswordHasher,
};
use async_trait::async_trait;
use bcrypt::{non_truncating_hash, non_truncating_verify, BcryptError, DEFAULT_COST};
use domain::PasswordHash;

/// bcrypt 哈希，计算放在阻塞线程池中执行。
///
/// 使用不截断的接口：超过 72 字节的明文报错，而不是只比较前缀。
#[derive(Clone)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    pub fn new(cost: Option<u32>) -> Self {
        Self {
            cost: cost.unwrap_or(DEFAULT_COST),
        }
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self::new(None)
    }
}

async fn run_blocking<T, F>(job: F) -> Result<Result<T, BcryptError>, tokio::task::JoinError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BcryptError> + Send + 'static,
{
    tokio::task::spawn_blocking(job).await
}

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
        ensure_hashable(plaintext)?;

        let cost = self.cost;
        let plaintext = plaintext.to_owned();
        let hashed = match run_blocking(move || non_truncating_hash(plaintext, cost)).await {
            Ok(Ok(hashed)) => hashed,
            Ok(Err(BcryptError::Truncation(len))) => {
                return Err(PasswordHasherError::TooLong { len })
            }
            Ok(Err(err)) => return Err(PasswordHasherError::hash_error(err.to_string())),
            Err(join) => return Err(PasswordHasherError::hash_error(join.to_string())),
        };

        PasswordHash::new(hashed).map_err(|err| PasswordHasherError::hash_error(err.to_string()))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        // 超长明文不可能由本服务哈希过
        if ensure_hashable(plaintext).is_err() {
            return Ok(false);
        }

        let plaintext = plaintext.to_owned();
        let hashed = hashed.as_str().to_owned();
        match run_blocking(move || non_truncating_verify(plaintext, &hashed)).await {
            Ok(Ok(matched)) => Ok(matched),
            Ok(Err(BcryptError::Truncation(_))) => Ok(false),
            Ok(Err(err)) => Err(PasswordHasherError::verify_error(err.to_string())),
            Err(join) => Err(PasswordHasherError::verify_error(join.to_string())),
        }
    }
}
