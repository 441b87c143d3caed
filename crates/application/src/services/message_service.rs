//! 私信用例：联系人列表、会话历史、发送私信

use std::{sync::Arc, time::Duration};

use domain::{ImageUrl, Message, MessageId, MessageText, User, UserId};
use tracing::{debug, info};

use crate::{
    broadcaster::{RealtimeDelivery, RealtimeEvent},
    clock::Clock,
    dto::MessageDto,
    error::ApplicationError,
    media::{upload_with_timeout, MediaStore},
    repository::{MessageRepository, UserRepository},
};

#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub text: Option<String>,
    /// 待上传的图片内容
    pub image: Option<String>,
}

pub struct MessageServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub media_store: Arc<dyn MediaStore>,
    pub media_timeout: Duration,
    pub clock: Arc<dyn Clock>,
    pub delivery: Arc<dyn RealtimeDelivery>,
}

pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    /// 除自己以外的所有用户
    pub async fn list_contacts(&self, user_id: UserId) -> Result<Vec<User>, ApplicationError> {
        Ok(self.deps.user_repository.list_except(user_id).await?)
    }

    /// 两人之间的全部私信，最新的在前
    pub async fn conversation(
        &self,
        user_id: UserId,
        other_id: UserId,
    ) -> Result<Vec<Message>, ApplicationError> {
        Ok(self
            .deps
            .message_repository
            .list_between(user_id, other_id)
            .await?)
    }

    /// 发送私信
    ///
    /// 先推送给在线的接收者，再落库。接收者离线时推送被丢弃，
    /// 消息仍然会保存，之后可通过会话历史拉取。
    pub async fn send(&self, request: SendMessageRequest) -> Result<Message, ApplicationError> {
        let text = request.text.and_then(MessageText::parse);
        let image_payload = request.image.filter(|image| !image.trim().is_empty());
        if text.is_none() && image_payload.is_none() {
            return Err(ApplicationError::validation("Text or image is required"));
        }

        if self
            .deps
            .user_repository
            .find_by_id(request.receiver_id)
            .await?
            .is_none()
        {
            return Err(ApplicationError::RecipientNotFound);
        }

        let image: Option<ImageUrl> = match image_payload {
            Some(payload) => Some(
                upload_with_timeout(
                    self.deps.media_store.as_ref(),
                    &payload,
                    self.deps.media_timeout,
                )
                .await?,
            ),
            None => None,
        };

        let message = Message::new(
            MessageId::generate(),
            request.sender_id,
            request.receiver_id,
            text,
            image,
            self.deps.clock.now(),
        )?;

        let delivered = self
            .deps
            .delivery
            .deliver(
                message.receiver_id,
                RealtimeEvent::NewMessage(MessageDto::from(&message)),
            )
            .await;
        if !delivered {
            debug!(message_id = %message.id, receiver_id = %message.receiver_id, "receiver offline");
        }

        let stored = self.deps.message_repository.create(message).await?;
        info!(
            message_id = %stored.id,
            sender_id = %stored.sender_id,
            receiver_id = %stored.receiver_id,
            delivered,
            "message sent"
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        local_broadcast::RealtimeHub,
        media::MockMediaStore,
        memory::{MemoryMessageRepository, MemoryUserRepository},
        repository::UserRepository,
        services::test_support::StepClock,
    };
    use chrono::Utc;
    use domain::{PasswordHash, UserEmail, Username};

    struct Fixture {
        users: Arc<MemoryUserRepository>,
        messages: Arc<MemoryMessageRepository>,
        hub: Arc<RealtimeHub>,
        service: MessageService,
    }

    fn fixture(media_store: MockMediaStore) -> Fixture {
        let users = Arc::new(MemoryUserRepository::new());
        let messages = Arc::new(MemoryMessageRepository::new());
        let hub = Arc::new(RealtimeHub::new());
        let service = MessageService::new(MessageServiceDependencies {
            user_repository: users.clone(),
            message_repository: messages.clone(),
            media_store: Arc::new(media_store),
            media_timeout: Duration::from_secs(1),
            clock: Arc::new(StepClock::default()),
            delivery: hub.clone(),
        });
        Fixture {
            users,
            messages,
            hub,
            service,
        }
    }

    async fn add_user(repository: &MemoryUserRepository, name: &str) -> UserId {
        let user = User::register(
            UserId::generate(),
            Username::parse(name).unwrap(),
            UserEmail::parse(format!("{name}@example.com")).unwrap(),
            PasswordHash::new("hash").unwrap(),
            Utc::now(),
        );
        repository.create(user).await.unwrap().id
    }

    fn text_to(sender_id: UserId, receiver_id: UserId, text: &str) -> SendMessageRequest {
        SendMessageRequest {
            sender_id,
            receiver_id,
            text: Some(text.into()),
            image: None,
        }
    }

    #[tokio::test]
    async fn empty_message_is_rejected_and_not_stored() {
        let mut store = MockMediaStore::new();
        store.expect_upload().never();
        let fx = fixture(store);
        let a = add_user(&fx.users, "alice").await;
        let b = add_user(&fx.users, "bob").await;

        let err = fx
            .service
            .send(SendMessageRequest {
                sender_id: a,
                receiver_id: b,
                text: Some("   ".into()),
                image: Some(String::new()),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::Validation(ref m) if m == "Text or image is required"));
        assert_eq!(fx.messages.len().await, 0);
    }

    #[tokio::test]
    async fn offline_recipient_still_gets_history() {
        let fx = fixture(MockMediaStore::new());
        let a = add_user(&fx.users, "alice").await;
        let b = add_user(&fx.users, "bob").await;

        fx.service.send(text_to(a, b, "first")).await.unwrap();
        fx.service.send(text_to(b, a, "second")).await.unwrap();

        let history = fx.service.conversation(b, a).await.unwrap();
        let texts: Vec<&str> = history
            .iter()
            .filter_map(|m| m.text.as_ref().map(MessageText::as_str))
            .collect();
        assert_eq!(texts, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn online_recipient_receives_new_message() {
        let fx = fixture(MockMediaStore::new());
        let a = add_user(&fx.users, "alice").await;
        let b = add_user(&fx.users, "bob").await;
        let (_ctx, mut rx) = fx.hub.open(Some(b)).await;
        while rx.try_recv().is_ok() {}

        let sent = fx.service.send(text_to(a, b, "hi")).await.unwrap();

        match rx.try_recv().unwrap() {
            RealtimeEvent::NewMessage(dto) => {
                assert_eq!(dto.id, uuid::Uuid::from(sent.id));
                assert_eq!(dto.text.as_deref(), Some("hi"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_recipient_is_rejected() {
        let fx = fixture(MockMediaStore::new());
        let a = add_user(&fx.users, "alice").await;

        let err = fx
            .service
            .send(text_to(a, UserId::generate(), "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::RecipientNotFound));
        assert_eq!(fx.messages.len().await, 0);
    }

    #[tokio::test]
    async fn image_is_uploaded_before_storing() {
        let mut store = MockMediaStore::new();
        store
            .expect_upload()
            .times(1)
            .returning(|_| Ok(ImageUrl::new("https://cdn.test/pic.png").unwrap()));
        let fx = fixture(store);
        let a = add_user(&fx.users, "alice").await;
        let b = add_user(&fx.users, "bob").await;

        let message = fx
            .service
            .send(SendMessageRequest {
                sender_id: a,
                receiver_id: b,
                text: None,
                image: Some("data:image/png;base64,AAAA".into()),
            })
            .await
            .unwrap();

        assert!(message.text.is_none());
        assert_eq!(
            message.image.as_ref().map(ImageUrl::as_str),
            Some("https://cdn.test/pic.png")
        );
    }

    #[tokio::test]
    async fn contacts_exclude_caller() {
        let fx = fixture(MockMediaStore::new());
        let a = add_user(&fx.users, "alice").await;
        let b = add_user(&fx.users, "bob").await;
        let c = add_user(&fx.users, "carol").await;

        let contacts: Vec<UserId> = fx
            .service
            .list_contacts(a)
            .await
            .unwrap()
            .into_iter()
            .map(|user| user.id)
            .collect();
        assert_eq!(contacts, vec![b, c]);
    }
}
