//! 主应用程序入口
//!
//! 启动 Axum Web API 服务。

use std::sync::Arc;

use application::{
    MessageService, MessageServiceDependencies, RealtimeHub, SystemClock, UserService,
    UserServiceDependencies,
};
use config::AppConfig;
use infrastructure::{Infrastructure, InfrastructureConfig};
use tracing_subscriber::EnvFilter;
use web_api::{cors_layer, router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志，未设置 RUST_LOG 时默认 info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;
    tracing::info!(config = %config.sanitized(), "configuration loaded");

    let infra = Infrastructure::connect(InfrastructureConfig::from(&config)).await?;
    let user_repository = infra.user_repository();
    let media_store = infra.media_store.clone();
    let clock = Arc::new(SystemClock);
    let hub = Arc::new(RealtimeHub::new());

    let user_service = UserService::new(UserServiceDependencies {
        user_repository: user_repository.clone(),
        password_hasher: infra.password_hasher_trait(),
        clock: clock.clone(),
        media_store: media_store.clone(),
        media_timeout: config.media.timeout(),
    });

    let message_service = MessageService::new(MessageServiceDependencies {
        user_repository,
        message_repository: infra.message_repository(),
        media_store,
        media_timeout: config.media.timeout(),
        clock,
        delivery: hub.clone(),
    });

    let state = AppState::new(
        Arc::new(user_service),
        Arc::new(message_service),
        Arc::new(JwtService::new(&config.jwt)),
        hub,
        config.secure_cookies(),
    );

    let app = router(state).layer(cors_layer(&config.cors.client_origin)?);
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(address = %address, environment = ?config.environment, "chat server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
