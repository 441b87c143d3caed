#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use application::{
    memory::{MemoryMessageRepository, MemoryUserRepository},
    MessageService, MessageServiceDependencies, RealtimeHub, SystemClock, UserService,
    UserServiceDependencies,
};
use futures_util::StreamExt;
use infrastructure::{BcryptPasswordHasher, InlineMediaStore};
use reqwest::{header, Client, Response};
use serde_json::{json, Value};
use tokio::{net::TcpListener, net::TcpStream, sync::oneshot, time::timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream,
};
use uuid::Uuid;
use web_api::{router, AppState, JwtConfig, JwtService};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const TEST_SECRET: &str = "integration-test-secret";

/// 运行在随机端口上的完整应用，仓储使用内存实现
pub struct TestApp {
    pub base_http: String,
    pub base_ws: String,
    pub client: Client,
    pub hub: Arc<RealtimeHub>,
    pub users: Arc<MemoryUserRepository>,
    pub messages: Arc<MemoryMessageRepository>,
    pub jwt: Arc<JwtService>,
    _shutdown: oneshot::Sender<()>,
}

/// 注册后得到的用户资料和会话 Cookie
pub struct Session {
    pub id: Uuid,
    pub profile: Value,
    pub cookie: String,
}

pub async fn spawn_app() -> TestApp {
    let users = Arc::new(MemoryUserRepository::new());
    let messages = Arc::new(MemoryMessageRepository::new());
    let hub = Arc::new(RealtimeHub::new());
    let media_store = Arc::new(InlineMediaStore);

    let user_service = UserService::new(UserServiceDependencies {
        user_repository: users.clone(),
        password_hasher: Arc::new(BcryptPasswordHasher::new(Some(4))),
        clock: Arc::new(SystemClock),
        media_store: media_store.clone(),
        media_timeout: Duration::from_secs(2),
    });
    let message_service = MessageService::new(MessageServiceDependencies {
        user_repository: users.clone(),
        message_repository: messages.clone(),
        media_store,
        media_timeout: Duration::from_secs(2),
        clock: Arc::new(SystemClock),
        delivery: hub.clone(),
    });
    let jwt = Arc::new(JwtService::new(&JwtConfig {
        secret: TEST_SECRET.to_string(),
        expiration_minutes: 60,
    }));

    let state = AppState::new(
        Arc::new(user_service),
        Arc::new(message_service),
        jwt.clone(),
        hub.clone(),
        false,
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let app = router(state);

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    TestApp {
        base_http: format!("http://{addr}"),
        base_ws: format!("ws://{addr}"),
        client: Client::new(),
        hub,
        users,
        messages,
        jwt,
        _shutdown: shutdown_tx,
    }
}

/// 从响应头中取出 `jwt=...` 片段，可直接放进 Cookie 请求头
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("jwt="))
        .and_then(|value| value.split(';').next())
        .map(str::to_owned)
}

pub fn set_cookie_header(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_http, path)
    }

    pub async fn signup(&self, name: &str) -> Session {
        let response = self
            .client
            .post(self.url("/api/auth/signup"))
            .json(&json!({
                "username": name,
                "email": format!("{name}@example.com"),
                "password": "secret1"
            }))
            .send()
            .await
            .expect("signup request");
        assert_eq!(response.status(), 201, "signup {name}");

        let cookie = session_cookie(&response).expect("session cookie");
        let profile: Value = response.json().await.expect("profile json");
        let id = profile["id"]
            .as_str()
            .and_then(|raw| raw.parse().ok())
            .expect("profile id");

        Session {
            id,
            profile,
            cookie,
        }
    }

    pub async fn get(&self, path: &str, cookie: &str) -> Response {
        self.client
            .get(self.url(path))
            .header(header::COOKIE, cookie)
            .send()
            .await
            .expect("GET request")
    }

    pub async fn post_json(&self, path: &str, cookie: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .header(header::COOKIE, cookie)
            .json(&body)
            .send()
            .await
            .expect("POST request")
    }

    pub async fn connect_ws(&self, user_id: Option<Uuid>) -> WsStream {
        let url = match user_id {
            Some(id) => format!("{}/ws?userId={id}", self.base_ws),
            None => format!("{}/ws", self.base_ws),
        };
        let (stream, _) = connect_async(url).await.expect("websocket connect");
        stream
    }
}

/// 读取下一条事件，超时返回 None
pub async fn next_event(ws: &mut WsStream) -> Option<Value> {
    loop {
        let frame = timeout(Duration::from_secs(2), ws.next()).await.ok()??;
        match frame.ok()? {
            TungsteniteMessage::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            TungsteniteMessage::Close(_) => return None,
            _ => continue,
        }
    }
}

/// 一直读到指定事件为止
pub async fn wait_for_event(ws: &mut WsStream, event: &str) -> Option<Value> {
    loop {
        let value = next_event(ws).await?;
        if value["event"] == event {
            return Some(value);
        }
    }
}

/// 读到满足条件的在线列表为止
pub async fn wait_for_online_users(
    ws: &mut WsStream,
    predicate: impl Fn(&[String]) -> bool,
) -> Option<Vec<String>> {
    loop {
        let value = wait_for_event(ws, "getOnlineUsers").await?;
        let users: Vec<String> = value["data"]
            .as_array()?
            .iter()
            .filter_map(|id| id.as_str().map(str::to_owned))
            .collect();
        if predicate(&users) {
            return Some(users);
        }
    }
}
