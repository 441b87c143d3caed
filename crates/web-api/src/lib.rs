//! Web API 层。
//!
//! 提供 Axum 路由，将 HTTP / WebSocket 请求委托给应用层的用例服务。

mod auth;
mod error;
mod extract;
mod routes;
mod session;
mod state;
mod ws_connection;

pub use auth::{Claims, JwtService, TokenError};
pub use config::JwtConfig;
pub use error::ApiError;
pub use routes::{cors_layer, router};
pub use session::{CurrentUser, SESSION_COOKIE};
pub use state::AppState;
