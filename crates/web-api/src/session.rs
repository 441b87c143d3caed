//! 会话 Cookie 与鉴权中间件

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use domain::User;

use crate::{error::ApiError, state::AppState};

pub const SESSION_COOKIE: &str = "jwt";

/// 通过鉴权后的当前用户，由 [`require_session`] 写入请求扩展
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))
    }
}

fn base_cookie(value: String, max_age: time::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(max_age)
        .build()
}

pub fn session_cookie(token: String, ttl: chrono::Duration, secure: bool) -> Cookie<'static> {
    base_cookie(token, time::Duration::seconds(ttl.num_seconds()), secure)
}

/// 立即过期的空 Cookie，用于登出
pub fn cleared_session_cookie(secure: bool) -> Cookie<'static> {
    base_cookie(String::new(), time::Duration::ZERO, secure)
}

/// 鉴权中间件：Cookie 中取令牌、校验、解析用户，任一步失败直接返回 401
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|token| !token.is_empty())
    else {
        tracing::warn!(path = %request.uri().path(), "request without session token");
        return Err(ApiError::unauthorized("Unauthorized"));
    };

    let user_id = state.jwt_service.verify(&token).map_err(|err| {
        tracing::warn!(error = %err, "session token rejected");
        ApiError::from(err)
    })?;

    let Some(user) = state.user_service.find_by_id(user_id).await? else {
        tracing::warn!(user_id = %user_id, "session subject no longer exists");
        return Err(ApiError::unauthorized("Unauthorized"));
    };

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
