//! UseCase: メッセージの編集・削除
//!
//! 送信者であること・削除済みでないことの判定は永続化コラボレーターが行い、
//! ここでは結果をチャットルームへ中継します。

use std::sync::Arc;

use hangspace_shared::time::Clock;

use crate::domain::{
    ChatRepository, Message, MessageContent, MessageId, MessageRepository, ServerEvent,
    Timestamp, UserId,
};

use super::{EventEmitter, ensure_participant, error::ActionError};

pub struct MessageLifecycleUseCase {
    chats: Arc<dyn ChatRepository>,
    messages: Arc<dyn MessageRepository>,
    emitter: EventEmitter,
    clock: Arc<dyn Clock>,
}

impl MessageLifecycleUseCase {
    pub fn new(
        chats: Arc<dyn ChatRepository>,
        messages: Arc<dyn MessageRepository>,
        emitter: EventEmitter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            chats,
            messages,
            emitter,
            clock,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// 本文を編集し、`message_updated` をルームに配信
    pub async fn edit(
        &self,
        user_id: &UserId,
        message_id: &MessageId,
        content: String,
    ) -> Result<Message, ActionError> {
        let content = MessageContent::new(content)?;
        let edited_at = self.now();
        let message = self
            .messages
            .update_content(message_id, user_id, content.into_string(), edited_at)
            .await?;
        self.emitter
            .to_room_except(
                &message.chat_id,
                None,
                &ServerEvent::MessageUpdated {
                    message_id: message.id.clone(),
                    chat_id: message.chat_id.clone(),
                    new_content: message.content.clone(),
                    edit_count: message.edit_count,
                    edited_at: edited_at.to_rfc3339(),
                },
            )
            .await;
        Ok(message)
    }

    /// 送信者による削除
    pub async fn delete(
        &self,
        user_id: &UserId,
        message_id: &MessageId,
    ) -> Result<Message, ActionError> {
        let message = self
            .messages
            .delete_message(message_id, user_id, self.now())
            .await?;
        self.emitter
            .to_room_except(
                &message.chat_id,
                None,
                &ServerEvent::MessageDeleted {
                    message_id: message.id.clone(),
                    chat_id: message.chat_id.clone(),
                },
            )
            .await;
        Ok(message)
    }

    /// 全員に対する削除
    pub async fn delete_for_everyone(
        &self,
        user_id: &UserId,
        message_id: &MessageId,
    ) -> Result<Message, ActionError> {
        let message = self
            .messages
            .delete_for_everyone(message_id, user_id, self.now())
            .await?;
        self.emitter
            .to_room_except(
                &message.chat_id,
                None,
                &ServerEvent::MessageDeletedForEveryone {
                    message_id: message.id.clone(),
                    chat_id: message.chat_id.clone(),
                    deleted_by: user_id.clone(),
                },
            )
            .await;
        Ok(message)
    }

    /// 自分に対してだけ削除（自分の全接続にだけ通知）
    pub async fn delete_for_me(
        &self,
        user_id: &UserId,
        message_id: &MessageId,
    ) -> Result<(), ActionError> {
        let message = self.messages.get_message(message_id).await?;
        ensure_participant(self.chats.as_ref(), &message.chat_id, user_id).await?;
        self.messages.delete_for_user(message_id, user_id).await?;
        self.emitter
            .to_user(
                user_id,
                &ServerEvent::MessageDeletedForUser {
                    message_id: message.id,
                    user_id: user_id.clone(),
                },
            )
            .await;
        Ok(())
    }
}
