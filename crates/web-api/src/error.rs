use application::{password::PasswordHasherError, ApplicationError};
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{value_objects::MAX_PASSWORD_BYTES, DomainError, RepositoryError};
use serde::Serialize;

use crate::auth::TokenError;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// 所有错误响应的统一结构 `{"message": ...}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 记录原始错误，对外只返回通用信息
    pub fn internal(error: &dyn std::error::Error) -> Self {
        tracing::error!(error = %error, "request failed with internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.body.message
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use ApplicationError as AppErr;

        match error {
            AppErr::Validation(message) => ApiError::bad_request(message),
            AppErr::Domain(DomainError::InvalidArgument { field, reason }) => {
                ApiError::bad_request(format!("Invalid {field}: {reason}"))
            }
            AppErr::Domain(DomainError::UserAlreadyExists)
            | AppErr::Repository(RepositoryError::Conflict) => {
                ApiError::bad_request("User already exists")
            }
            AppErr::Domain(DomainError::UserNotFound) => ApiError::bad_request("User Not Found"),
            AppErr::Domain(DomainError::EmptyMessage) => {
                ApiError::bad_request("Text or image is required")
            }
            AppErr::InvalidCredentials => ApiError::bad_request("Invalid credentials"),
            AppErr::Password(PasswordHasherError::TooLong { .. }) => {
                ApiError::bad_request(format!("Password must be at most {MAX_PASSWORD_BYTES} bytes"))
            }
            AppErr::RecipientNotFound => ApiError::not_found("Receiver not found"),
            AppErr::Repository(RepositoryError::NotFound) => {
                ApiError::not_found("Resource not found")
            }
            other @ (AppErr::Repository(RepositoryError::Storage { .. })
            | AppErr::Password(_)
            | AppErr::Media(_)
            | AppErr::Infrastructure(_)) => ApiError::internal(&other),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Expired => ApiError::unauthorized("Token expired"),
            TokenError::InvalidToken => ApiError::unauthorized("Invalid token"),
            TokenError::Signing(_) => ApiError::internal(&error),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "invalid path parameter");
        ApiError::bad_request("Invalid id")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
