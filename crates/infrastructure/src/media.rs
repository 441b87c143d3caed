//! 媒体上传适配器
//!
//! 配置了上传地址时使用 [`HttpMediaStore`]，否则退化为 [`InlineMediaStore`]，
//! 直接把客户端传来的内容当作图片地址保存。

use application::{MediaError, MediaStore};
use async_trait::async_trait;
use domain::ImageUrl;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    file: &'a str,
    upload_preset: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

/// 通过 HTTP 接口上传（兼容 Cloudinary 的 unsigned upload）
#[derive(Clone)]
pub struct HttpMediaStore {
    client: Client,
    upload_url: String,
    upload_preset: String,
}

impl HttpMediaStore {
    pub fn new(upload_url: impl Into<String>, upload_preset: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            upload_url: upload_url.into(),
            upload_preset: upload_preset.into(),
        }
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn upload(&self, payload: &str) -> Result<ImageUrl, MediaError> {
        let response = self
            .client
            .post(&self.upload_url)
            .json(&UploadRequest {
                file: payload,
                upload_preset: &self.upload_preset,
            })
            .send()
            .await
            .map_err(|err| MediaError::Upload(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "media upload rejected");
            return Err(MediaError::Upload(format!("upload endpoint returned {status}")));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|err| MediaError::InvalidResponse(err.to_string()))?;

        let url = parsed
            .secure_url
            .ok_or_else(|| MediaError::InvalidResponse("missing secure_url".into()))?;
        ImageUrl::new(url).map_err(|err| MediaError::InvalidResponse(err.to_string()))
    }
}

/// 本地开发用：不上传，原样保存
#[derive(Debug, Clone, Default)]
pub struct InlineMediaStore;

#[async_trait]
impl MediaStore for InlineMediaStore {
    async fn upload(&self, payload: &str) -> Result<ImageUrl, MediaError> {
        ImageUrl::new(payload).map_err(|err| MediaError::Upload(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/upload")
    }

    #[tokio::test]
    async fn uploads_payload_and_reads_secure_url() {
        let router = Router::new().route(
            "/upload",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["upload_preset"], "chat_app");
                assert_eq!(body["file"], "data:image/png;base64,AAAA");
                Json(json!({ "secure_url": "https://cdn.test/a.png" }))
            }),
        );
        let store = HttpMediaStore::new(spawn_stub(router).await, "chat_app");

        let url = store.upload("data:image/png;base64,AAAA").await.unwrap();
        assert_eq!(url.as_str(), "https://cdn.test/a.png");
    }

    #[tokio::test]
    async fn error_status_is_upload_error() {
        let router = Router::new().route(
            "/upload",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let store = HttpMediaStore::new(spawn_stub(router).await, "chat_app");

        let err = store.upload("data:image/png;base64,AAAA").await.unwrap_err();
        assert!(matches!(err, MediaError::Upload(_)));
    }

    #[tokio::test]
    async fn response_without_url_is_invalid() {
        let router = Router::new().route("/upload", post(|| async { Json(json!({})) }));
        let store = HttpMediaStore::new(spawn_stub(router).await, "chat_app");

        let err = store.upload("data:image/png;base64,AAAA").await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn inline_store_keeps_payload() {
        let url = InlineMediaStore.upload("data:image/png;base64,AAAA").await.unwrap();
        assert_eq!(url.as_str(), "data:image/png;base64,AAAA");
        assert!(InlineMediaStore.upload("  ").await.is_err());
    }
}
