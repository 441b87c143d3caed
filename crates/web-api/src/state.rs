use std::sync::Arc;

use application::{MessageService, RealtimeHub, UserService};

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub message_service: Arc<MessageService>,
    pub jwt_service: Arc<JwtService>,
    pub hub: Arc<RealtimeHub>,
    /// 非开发环境下 Cookie 带 Secure 标记
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(
        user_service: Arc<UserService>,
        message_service: Arc<MessageService>,
        jwt_service: Arc<JwtService>,
        hub: Arc<RealtimeHub>,
        cookie_secure: bool,
    ) -> Self {
        Self {
            user_service,
            message_service,
            jwt_service,
            hub,
            cookie_secure,
        }
    }
}
