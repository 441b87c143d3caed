use std::sync::Arc;

use application::{ConnectionContext, EventReceiver, RealtimeHub};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::UserId;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

/// WebSocket 连接管理器
///
/// 封装单个实时连接的状态和逻辑，包括：
/// - 在线状态登记与清理
/// - 推送事件写出
/// - 心跳回应
pub struct WebSocketConnection {
    hub: Arc<RealtimeHub>,
    context: ConnectionContext,
    events: EventReceiver,
}

impl WebSocketConnection {
    /// 在投递中心登记连接，登记时会向所有连接广播在线列表
    pub async fn open(hub: Arc<RealtimeHub>, user_id: Option<UserId>) -> Self {
        let (context, events) = hub.open(user_id).await;
        tracing::info!(
            connection_id = %context.connection_id,
            user_id = ?user_id,
            "websocket connected"
        );

        Self {
            hub,
            context,
            events,
        }
    }

    /// 运行连接主循环，直到任一方向结束
    pub async fn run(self, socket: WebSocket) {
        let Self {
            hub,
            context,
            mut events,
        } = self;
        let (mut sender, mut incoming) = socket.split();

        // 所有写操作都经过命令通道
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(32);

        let mut send_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(cmd) = cmd_rx.recv() => {
                        let frame = match cmd {
                            WsCommand::SendPong(data) => WsMessage::Pong(data.into()),
                        };
                        if sender.send(frame).await.is_err() {
                            tracing::warn!("failed to send pong");
                            break;
                        }
                    }
                    event = events.recv() => {
                        // 投递中心摘除了积压过多的连接
                        let Some(event) = event else {
                            tracing::warn!("event queue closed by hub");
                            break;
                        };
                        let payload = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(err) => {
                                tracing::warn!(error = %err, event = event.name(), "failed to serialize realtime event");
                                continue;
                            }
                        };
                        if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                            tracing::warn!(event = event.name(), "failed to push realtime event");
                            break;
                        }
                    }
                }
            }
        });

        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(message)) = incoming.next().await {
                if Self::handle_incoming(message, &cmd_tx).await.is_err() {
                    break;
                }
            }
        });

        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        hub.close(&context).await;
        tracing::info!(
            connection_id = %context.connection_id,
            user_id = ?context.user_id,
            "websocket disconnected"
        );
    }

    async fn handle_incoming(
        message: WsMessage,
        cmd_tx: &mpsc::Sender<WsCommand>,
    ) -> Result<(), ()> {
        match message {
            WsMessage::Close(_) => return Err(()),
            WsMessage::Ping(data) => {
                if cmd_tx.send(WsCommand::SendPong(data.to_vec())).await.is_err() {
                    return Err(());
                }
            }
            WsMessage::Pong(_) => {}
            // 客户端不通过该通道发送业务消息
            WsMessage::Text(_) | WsMessage::Binary(_) => {
                tracing::debug!("ignoring client frame");
            }
        }
        Ok(())
    }
}

/// WebSocket 写操作命令
#[derive(Debug)]
enum WsCommand {
    SendPong(Vec<u8>),
}
