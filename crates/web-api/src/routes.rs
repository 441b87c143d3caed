use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::{
    LoginRequest, MessageDto, SendMessageRequest, SignupRequest, UserProfileDto,
};
use domain::{User, UserId};

use crate::{
    error::ApiError,
    extract::{JsonBody, PathParam},
    session::{cleared_session_cookie, require_session, session_cookie, CurrentUser},
    state::AppState,
    ws_connection::WebSocketConnection,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SignupPayload {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoginPayload {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ProfilePayload {
    profile_pic: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SendMessagePayload {
    text: Option<String>,
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(websocket_upgrade))
        .nest("/api/auth", auth_routes(&state))
        .nest("/api/messages", message_routes(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
        .route("/profile", put(update_profile).patch(update_profile))
        .route("/check-auth", get(check_auth))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .merge(protected)
}

fn message_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/{id}", get(conversation))
        .route("/send/{id}", post(send_message))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
}

/// 只允许配置的前端来源携带凭据访问
pub fn cors_layer(client_origin: &str) -> Result<CorsLayer, header::InvalidHeaderValue> {
    let origin = HeaderValue::from_str(client_origin.trim_end_matches('/'))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

fn with_session(state: &AppState, user: &User) -> Result<CookieJar, ApiError> {
    let token = state.jwt_service.issue(user.id)?;
    Ok(CookieJar::new().add(session_cookie(
        token,
        state.jwt_service.ttl(),
        state.cookie_secure,
    )))
}

async fn signup(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SignupPayload>,
) -> Result<(StatusCode, CookieJar, Json<UserProfileDto>), ApiError> {
    let user = state
        .user_service
        .signup(SignupRequest {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let jar = with_session(&state, &user)?;
    Ok((StatusCode::CREATED, jar, Json(UserProfileDto::from(&user))))
}

async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginPayload>,
) -> Result<(CookieJar, Json<UserProfileDto>), ApiError> {
    let user = state
        .user_service
        .login(LoginRequest {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let jar = with_session(&state, &user)?;
    Ok((jar, Json(UserProfileDto::from(&user))))
}

async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> (CookieJar, Json<MessageResponse>) {
    tracing::info!(user_id = %user.id, "user logged out");
    let jar = CookieJar::new().add(cleared_session_cookie(state.cookie_secure));
    (
        jar,
        Json(MessageResponse {
            message: "Logged out successfully",
        }),
    )
}

async fn refresh_token(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<(CookieJar, Json<UserProfileDto>), ApiError> {
    let jar = with_session(&state, &user)?;
    Ok((jar, Json(UserProfileDto::from(&user))))
}

async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(payload): JsonBody<ProfilePayload>,
) -> Result<Json<UserProfileDto>, ApiError> {
    let Some(profile_pic) = payload.profile_pic.filter(|pic| !pic.trim().is_empty()) else {
        return Err(ApiError::unauthorized("Profile pic is required"));
    };

    let updated = state
        .user_service
        .update_profile_pic(user.id, &profile_pic)
        .await?;
    Ok(Json(UserProfileDto::from(&updated)))
}

async fn check_auth(CurrentUser(user): CurrentUser) -> Json<UserProfileDto> {
    Json(UserProfileDto::from(&user))
}

async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<UserProfileDto>>, ApiError> {
    let users = state.message_service.list_contacts(user.id).await?;
    Ok(Json(users.iter().map(UserProfileDto::from).collect()))
}

async fn conversation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParam(other_id): PathParam<Uuid>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let messages = state
        .message_service
        .conversation(user.id, UserId::from(other_id))
        .await?;
    Ok(Json(messages.iter().map(MessageDto::from).collect()))
}

async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParam(receiver_id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<SendMessagePayload>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let message = state
        .message_service
        .send(SendMessageRequest {
            sender_id: user.id,
            receiver_id: UserId::from(receiver_id),
            text: payload.text,
            image: payload.image,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(MessageDto::from(&message))))
}

async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Response {
    // 握手参数不合法时按匿名连接处理
    let user_id = query
        .user_id
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| match raw.parse::<UserId>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(user_id = %raw, "ignoring malformed userId on websocket handshake");
                None
            }
        });

    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| async move {
        WebSocketConnection::open(hub, user_id)
            .await
            .run(socket)
            .await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};

    use application::{
        memory::{MemoryMessageRepository, MemoryUserRepository},
        MessageService, MessageServiceDependencies, RealtimeHub, SystemClock, UserService,
        UserServiceDependencies,
    };
    use axum::{body::Body, http::Request};
    use config::{AppConfig, Environment, JwtConfig};
    use infrastructure::{BcryptPasswordHasher, InlineMediaStore};
    use tower::ServiceExt;

    use crate::JwtService;

    fn test_router() -> Router {
        test_router_for(&AppConfig::default())
    }

    fn test_router_for(config: &AppConfig) -> Router {
        let users = Arc::new(MemoryUserRepository::new());
        let hub = Arc::new(RealtimeHub::new());
        let user_service = UserService::new(UserServiceDependencies {
            user_repository: users.clone(),
            password_hasher: Arc::new(BcryptPasswordHasher::new(Some(4))),
            clock: Arc::new(SystemClock),
            media_store: Arc::new(InlineMediaStore),
            media_timeout: Duration::from_secs(1),
        });
        let message_service = MessageService::new(MessageServiceDependencies {
            user_repository: users,
            message_repository: Arc::new(MemoryMessageRepository::new()),
            media_store: Arc::new(InlineMediaStore),
            media_timeout: Duration::from_secs(1),
            clock: Arc::new(SystemClock),
            delivery: hub.clone(),
        });
        let jwt = JwtService::new(&JwtConfig {
            secret: "router-test-secret".into(),
            expiration_minutes: 60,
        });

        router(AppState::new(
            Arc::new(user_service),
            Arc::new(message_service),
            Arc::new(jwt),
            hub,
            config.secure_cookies(),
        ))
    }

    async fn signup_cookie(router: Router) -> String {
        let response = router
            .oneshot(
                Request::post("/api/auth/signup")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"username":"alice","email":"alice@example.com","password":"secret1"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap()
            .to_owned()
    }

    #[tokio::test]
    async fn session_cookie_is_secure_outside_development() {
        let development = signup_cookie(test_router()).await;
        assert!(!development.contains("Secure"));

        let mut production = AppConfig::default();
        production.environment = Environment::Production;
        let cookie = signup_cookie(test_router_for(&production)).await;
        assert!(cookie.starts_with("jwt="));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = test_router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_route_without_cookie_is_unauthorized() {
        let response = test_router()
            .oneshot(Request::get("/api/auth/check-auth").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_cookie_is_invalid_token() {
        let response = test_router()
            .oneshot(
                Request::get("/api/messages/users")
                    .header(header::COOKIE, "jwt=garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_field_is_bad_request() {
        let response = test_router()
            .oneshot(
                Request::post("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email":"a@b.c","password":"secret1","role":"admin"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
