//! UseCase: メッセージ送信（ファンアウト）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute()
//! - ルームの参加接続（送信元を除く）へ 1 回ずつ、送信元へ別に 1 回だけ届くこと
//! - 送信者以外の全チャット参加者の通知が集約され、バッジとともに配信されること
//!
//! ### なぜこのテストが必要か
//! - 送信者が自分のメッセージを二重に受け取る、または受け取れない不具合を防ぐ
//! - 永続化の失敗時に一部の参加者にだけ通知が届く状態を防ぐ
//!
//! ### どのような状況を想定しているか
//! - 正常系：送信者がルームに参加している / 参加していない
//! - 異常系：入力不正、参加者でない送信者、メッセージ・通知の永続化失敗
//!
//! ## 処理順序
//!
//! 1. 入力検証（永続化の前）
//! 2. 参加者の解決（送信者が参加者でなければ not-found）
//! 3. メッセージの永続化
//! 4. 全受信者の通知 upsert とバッジ計算（1 件でも失敗すれば中断）
//! 5. 受信者のアイデンティティチャンネルへ `notification_updated` とバッジ
//! 6. ルームへ `new_message`（送信元の接続を除く）
//! 7. 送信元の接続へ `new_message`

use std::sync::Arc;

use hangspace_shared::time::Clock;

use crate::domain::{
    ChatId, ChatRepository, ConnectionId, FileMetadata, Message, MessageContent, MessageKind,
    MessageRepository, NewMessage, Notification, RepositoryError, ServerEvent, Timestamp, UserId,
    UserRepository, event::MessagePayload, notification::UNKNOWN_SENDER,
};

use super::{EventEmitter, NotificationUseCase, error::SendMessageError};

/// `send_message` の入力（検証前）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub chat_id: Option<String>,
    pub content: String,
    pub kind: MessageKind,
    pub file: Option<FileMetadata>,
}

/// ファンアウトの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOut {
    pub message: Message,
    /// ルームへの配信数（送信元の接続を除く）
    pub room_deliveries: usize,
    /// 送信元の接続へ届いたか
    pub echoed: bool,
    /// 通知を更新した受信者数
    pub notified: usize,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    users: Arc<dyn UserRepository>,
    chats: Arc<dyn ChatRepository>,
    messages: Arc<dyn MessageRepository>,
    notifications: Arc<NotificationUseCase>,
    emitter: EventEmitter,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    pub fn new(
        users: Arc<dyn UserRepository>,
        chats: Arc<dyn ChatRepository>,
        messages: Arc<dyn MessageRepository>,
        notifications: Arc<NotificationUseCase>,
        emitter: EventEmitter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            chats,
            messages,
            notifications,
            emitter,
            clock,
        }
    }

    /// メッセージ送信を実行
    ///
    /// 失敗した場合は送信元の接続にだけ `message_error` を返し、
    /// ブロードキャスト・通知は一切行わない。
    /// メッセージの保存後に通知の更新が失敗した場合は、その `message_id` を添える。
    pub async fn execute(
        &self,
        origin: &ConnectionId,
        sender_id: &UserId,
        request: SendMessageRequest,
    ) -> Result<FanOut, SendMessageError> {
        let chat_id_hint = request.chat_id.clone();
        match self.dispatch_new_message(origin, sender_id, request).await {
            Ok(fan_out) => Ok(fan_out),
            Err(e) => {
                tracing::warn!(
                    connection_id = %origin,
                    user_id = %sender_id,
                    chat_id = chat_id_hint.as_deref().unwrap_or(""),
                    "send_message failed: {}",
                    e
                );
                self.emitter
                    .to_connection(
                        origin,
                        &ServerEvent::message_error(e.client_message(), chat_id_hint.as_deref())
                            .with_message_id(e.persisted_message_id()),
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn dispatch_new_message(
        &self,
        origin: &ConnectionId,
        sender_id: &UserId,
        request: SendMessageRequest,
    ) -> Result<FanOut, SendMessageError> {
        // 1. 入力検証
        let chat_id = request
            .chat_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(SendMessageError::MissingChatId)
            .and_then(|id| ChatId::new(id).map_err(SendMessageError::from))?;
        let content = MessageContent::new(request.content)?;

        // 2. 参加者の解決
        let participants = match self.chats.participants(&chat_id).await {
            Ok(participants) => participants,
            Err(RepositoryError::NotFound(_)) => {
                return Err(SendMessageError::ChatNotFound(chat_id.into_string()));
            }
            Err(e) => return Err(SendMessageError::MessagePersistence(e)),
        };
        if !participants.contains(sender_id) {
            return Err(SendMessageError::ChatNotFound(chat_id.into_string()));
        }

        // 3. メッセージの永続化
        let now = Timestamp::new(self.clock.now_millis());
        let message = self
            .messages
            .create_message(NewMessage {
                chat_id: chat_id.clone(),
                sender_id: sender_id.clone(),
                content,
                kind: request.kind,
                file: request.file,
                created_at: now,
            })
            .await
            .map_err(SendMessageError::MessagePersistence)?;

        let sender_name = match self.users.display_name(sender_id).await {
            Ok(Some(name)) => name,
            Ok(None) => UNKNOWN_SENDER.to_string(),
            Err(e) => {
                tracing::warn!(user_id = %sender_id, "Failed to resolve display name: {}", e);
                UNKNOWN_SENDER.to_string()
            }
        };

        // 4. 通知の upsert とバッジ計算（配信の前にすべて済ませる）
        let mut updates: Vec<(UserId, Notification, u64)> = Vec::new();
        for recipient in participants.iter().filter(|p| *p != sender_id) {
            let notification = self
                .notifications
                .upsert_message_notification(
                    recipient,
                    sender_id,
                    &sender_name,
                    &chat_id,
                    &message.content,
                    now,
                )
                .await
                .map_err(|source| SendMessageError::NotificationPersistence {
                    message_id: message.id.clone(),
                    source,
                })?;
            let unread_count = self
                .notifications
                .unread_count(recipient)
                .await
                .map_err(|source| SendMessageError::NotificationPersistence {
                    message_id: message.id.clone(),
                    source,
                })?;
            updates.push((recipient.clone(), notification, unread_count));
        }

        // 5. 受信者のアイデンティティチャンネルへ通知
        for (recipient, notification, unread_count) in &updates {
            self.emitter
                .to_user(recipient, &ServerEvent::notification_updated(notification))
                .await;
            self.emitter
                .to_user(
                    recipient,
                    &ServerEvent::NotificationBadgeUpdated {
                        unread_count: *unread_count,
                    },
                )
                .await;
        }

        // 6. ルームへ（送信元の接続を除く）
        let event = ServerEvent::NewMessage(MessagePayload::from_message(&message, sender_name));
        let room_deliveries = self
            .emitter
            .to_room_except(&chat_id, Some(origin), &event)
            .await;

        // 7. 送信元の接続へ
        let echoed = self.emitter.to_connection(origin, &event).await;

        tracing::info!(
            chat_id = %chat_id,
            user_id = %sender_id,
            message_id = %message.id,
            room_deliveries,
            notified = updates.len(),
            "Message fanned out"
        );

        Ok(FanOut {
            message,
            room_deliveries,
            echoed,
            notified: updates.len(),
        })
    }
}
