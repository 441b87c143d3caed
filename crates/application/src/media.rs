//! 媒体上传抽象
//!
//! 头像和私信图片都通过 `MediaStore` 上传，调用方统一加超时边界。

use std::time::Duration;

use async_trait::async_trait;
use domain::ImageUrl;
use thiserror::Error;

use crate::error::ApplicationError;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("invalid upload response: {0}")]
    InvalidResponse(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// 上传图片内容（data URI 或 base64），返回可访问的地址
    async fn upload(&self, payload: &str) -> Result<ImageUrl, MediaError>;
}

/// 带超时的上传，超时视为基础设施错误
pub async fn upload_with_timeout(
    store: &dyn MediaStore,
    payload: &str,
    timeout: Duration,
) -> Result<ImageUrl, ApplicationError> {
    match tokio::time::timeout(timeout, store.upload(payload)).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            tracing::error!(timeout_ms = timeout.as_millis() as u64, "media upload timed out");
            Err(ApplicationError::infrastructure("media upload timed out"))
        }
    }
}
