use std::{sync::Arc, time::Duration};

use domain::{
    value_objects::{MAX_PASSWORD_BYTES, MIN_PASSWORD_LENGTH},
    DomainError, RepositoryError, User, UserEmail, UserId, Username,
};
use tracing::info;

use crate::{
    clock::Clock,
    error::ApplicationError,
    media::{upload_with_timeout, MediaStore},
    password::PasswordHasher,
    repository::UserRepository,
};

/// 注册请求，字段缺失在服务内统一校验
#[derive(Debug, Clone, Default)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
    pub media_store: Arc<dyn MediaStore>,
    pub media_timeout: Duration,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<User, ApplicationError> {
        let (Some(username), Some(email), Some(password)) = (
            required(request.username),
            required(request.email),
            required(request.password),
        ) else {
            return Err(ApplicationError::validation("All fields are required"));
        };

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ApplicationError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(ApplicationError::validation(format!(
                "Password must be at most {MAX_PASSWORD_BYTES} bytes"
            )));
        }

        let username = Username::parse(username)?;
        let email = UserEmail::parse(email)
            .map_err(|_| ApplicationError::validation("Invalid email format"))?;

        if self
            .deps
            .user_repository
            .find_by_email(email.clone())
            .await?
            .is_some()
        {
            return Err(DomainError::UserAlreadyExists.into());
        }

        let password_hash = self.deps.password_hasher.hash(&password).await?;
        let user = User::register(
            UserId::generate(),
            username,
            email,
            password_hash,
            self.deps.clock.now(),
        );

        // 并发注册同一邮箱时由唯一约束兜底
        let stored = match self.deps.user_repository.create(user).await {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => return Err(DomainError::UserAlreadyExists.into()),
            Err(err) => return Err(err.into()),
        };

        info!(user_id = %stored.id, "user signed up");
        Ok(stored)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<User, ApplicationError> {
        let (Some(email), Some(password)) = (required(request.email), required(request.password))
        else {
            return Err(ApplicationError::validation("All fields are required"));
        };

        // 格式不合法的邮箱不可能存在于库中
        let user = match UserEmail::parse(email) {
            Ok(email) => self.deps.user_repository.find_by_email(email).await?,
            Err(_) => None,
        }
        .ok_or(DomainError::UserNotFound)?;

        if !self
            .deps
            .password_hasher
            .verify(&password, &user.password)
            .await?
        {
            return Err(ApplicationError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    pub async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, ApplicationError> {
        Ok(self.deps.user_repository.find_by_id(user_id).await?)
    }

    /// 上传头像并写回用户资料
    pub async fn update_profile_pic(
        &self,
        user_id: UserId,
        payload: &str,
    ) -> Result<User, ApplicationError> {
        if payload.trim().is_empty() {
            return Err(ApplicationError::validation("Profile pic is required"));
        }

        let mut user = self
            .deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        let image = upload_with_timeout(
            self.deps.media_store.as_ref(),
            payload,
            self.deps.media_timeout,
        )
        .await?;

        user.set_profile_pic(image, self.deps.clock.now());
        let updated = self.deps.user_repository.update(user).await?;
        info!(user_id = %updated.id, "profile picture updated");
        Ok(updated)
    }
}
