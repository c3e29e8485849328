//! InMemory ストア実装
//!
//! ドメイン層が定義する 4 つの Repository trait をまとめて実装します。
//! コレクションごとに `tokio::sync::Mutex` で保護した HashMap / Vec を使います。
//!
//! ## 技術的負債
//!
//! ドキュメントストア実装に置き換える際は、通知の upsert を
//! `findOneAndUpdate(..., upsert: true)` 相当のアトミック操作で実装する必要があります。
//! この実装ではコレクションのロック内で検索と更新を行うことでアトミック性を保証しています。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::seed::SeedFixture;
use crate::domain::notification::UNKNOWN_SENDER;
use crate::domain::{
    ActiveSender, ChatId, ChatRepository, Emoji, Message, MessageId, MessageRepository,
    NewMessage, Notification, NotificationId, NotificationRepository, NotificationUpsert,
    Reaction, RepositoryError, ThemeName, Timestamp, UserId, UserPresence, UserRepository,
    UserStatus,
};

/// ソフト削除後に残す本文
pub const DELETED_PLACEHOLDER: &str = "This message was deleted";

#[derive(Debug, Clone, Default)]
struct UserRecord {
    display_name: Option<String>,
    status: UserStatus,
    last_seen: Option<Timestamp>,
}

#[derive(Debug, Clone, Default)]
struct ChatRecord {
    participants: Vec<UserId>,
    themes: HashMap<UserId, &'static str>,
}

#[derive(Debug, Clone)]
struct MessageRecord {
    message: Message,
    reactions: Vec<Reaction>,
    hidden_for: HashSet<UserId>,
}

/// インメモリストア
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<UserId, UserRecord>>,
    chats: Mutex<HashMap<ChatId, ChatRecord>>,
    messages: Mutex<HashMap<MessageId, MessageRecord>>,
    notifications: Mutex<Vec<Notification>>,
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn not_found(kind: &str, id: &str) -> RepositoryError {
    RepositoryError::NotFound(format!("{} '{}'", kind, id))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// シードデータを投入したストアを作成
    pub async fn with_fixture(fixture: SeedFixture) -> Self {
        let store = Self::new();
        for user in fixture.users {
            store.add_user(user.id, user.display_name).await;
        }
        for chat in fixture.chats {
            store.add_chat(chat.id, chat.participants).await;
        }
        store
    }

    /// ユーザープロフィールを追加（既存なら表示名を更新）
    pub async fn add_user(&self, user_id: UserId, display_name: impl Into<String>) {
        let mut users = self.users.lock().await;
        users.entry(user_id).or_default().display_name = Some(display_name.into());
    }

    /// チャットを追加（既存なら参加者を置き換え）
    pub async fn add_chat(&self, chat_id: ChatId, participants: Vec<UserId>) {
        let mut chats = self.chats.lock().await;
        chats.entry(chat_id).or_default().participants = participants;
    }

    /// ユーザーがチャットに適用したテーマ
    #[cfg(test)]
    pub async fn theme_of(&self, chat_id: &ChatId, user_id: &UserId) -> Option<&'static str> {
        let chats = self.chats.lock().await;
        chats
            .get(chat_id)
            .and_then(|chat| chat.themes.get(user_id).copied())
    }

    /// ユーザーに対して非表示になっているか
    #[cfg(test)]
    pub async fn is_hidden_for(&self, message_id: &MessageId, user_id: &UserId) -> bool {
        let messages = self.messages.lock().await;
        messages
            .get(message_id)
            .is_some_and(|record| record.hidden_for.contains(user_id))
    }

    /// 通知の総行数（既読含む）
    #[cfg(test)]
    pub async fn notification_rows(&self, recipient_id: &UserId) -> usize {
        let notifications = self.notifications.lock().await;
        notifications
            .iter()
            .filter(|n| &n.recipient_id == recipient_id)
            .count()
    }

    fn soft_delete(record: &mut MessageRecord, sender_id: &UserId) -> Result<Message, RepositoryError> {
        if &record.message.sender_id != sender_id {
            return Err(not_found("message", record.message.id.as_str()));
        }
        if record.message.is_deleted {
            return Err(RepositoryError::Conflict(format!(
                "message '{}' is already deleted",
                record.message.id
            )));
        }
        record.message.is_deleted = true;
        record.message.content = DELETED_PLACEHOLDER.to_string();
        Ok(record.message.clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn display_name(&self, user_id: &UserId) -> Result<Option<String>, RepositoryError> {
        let users = self.users.lock().await;
        Ok(users.get(user_id).and_then(|u| u.display_name.clone()))
    }

    async fn set_status(
        &self,
        user_id: &UserId,
        status: UserStatus,
        at: Timestamp,
    ) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().await;
        let record = users.entry(user_id.clone()).or_default();
        record.status = status;
        record.last_seen = Some(at);
        Ok(())
    }

    async fn presence(&self, user_id: &UserId) -> Result<UserPresence, RepositoryError> {
        let users = self.users.lock().await;
        let record = users
            .get(user_id)
            .ok_or_else(|| not_found("user", user_id.as_str()))?;
        Ok(UserPresence {
            user_id: user_id.clone(),
            display_name: record
                .display_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            status: record.status,
            last_seen: record.last_seen,
        })
    }
}

#[async_trait]
impl ChatRepository for InMemoryStore {
    async fn participants(&self, chat_id: &ChatId) -> Result<Vec<UserId>, RepositoryError> {
        let chats = self.chats.lock().await;
        chats
            .get(chat_id)
            .map(|chat| chat.participants.clone())
            .ok_or_else(|| not_found("chat", chat_id.as_str()))
    }

    async fn save_theme(
        &self,
        chat_id: &ChatId,
        _user_id: &UserId,
        theme: &ThemeName,
    ) -> Result<(), RepositoryError> {
        let mut chats = self.chats.lock().await;
        let chat = chats
            .get_mut(chat_id)
            .ok_or_else(|| not_found("chat", chat_id.as_str()))?;
        let participants = chat.participants.clone();
        for participant in participants {
            chat.themes.insert(participant, theme.as_str());
        }
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn create_message(&self, new_message: NewMessage) -> Result<Message, RepositoryError> {
        {
            let chats = self.chats.lock().await;
            if !chats.contains_key(&new_message.chat_id) {
                return Err(not_found("chat", new_message.chat_id.as_str()));
            }
        }

        let id = MessageId::new(new_id()).map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let message = Message {
            id: id.clone(),
            chat_id: new_message.chat_id,
            sender_id: new_message.sender_id,
            content: new_message.content.into_string(),
            kind: new_message.kind,
            file: new_message.file,
            created_at: new_message.created_at,
            is_deleted: false,
            is_edited: false,
            edit_count: 0,
            read_by: Default::default(),
        };

        let mut messages = self.messages.lock().await;
        messages.insert(
            id,
            MessageRecord {
                message: message.clone(),
                reactions: Vec::new(),
                hidden_for: HashSet::new(),
            },
        );
        Ok(message)
    }

    async fn get_message(&self, message_id: &MessageId) -> Result<Message, RepositoryError> {
        let messages = self.messages.lock().await;
        messages
            .get(message_id)
            .map(|record| record.message.clone())
            .ok_or_else(|| not_found("message", message_id.as_str()))
    }

    async fn add_read_by(
        &self,
        message_id: &MessageId,
        reader_id: &UserId,
    ) -> Result<bool, RepositoryError> {
        let mut messages = self.messages.lock().await;
        let record = messages
            .get_mut(message_id)
            .ok_or_else(|| not_found("message", message_id.as_str()))?;
        Ok(record.message.read_by.insert(reader_id.clone()))
    }

    async fn update_content(
        &self,
        message_id: &MessageId,
        editor_id: &UserId,
        content: String,
        _at: Timestamp,
    ) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.lock().await;
        let record = messages
            .get_mut(message_id)
            .ok_or_else(|| not_found("message", message_id.as_str()))?;
        if &record.message.sender_id != editor_id {
            return Err(not_found("message", message_id.as_str()));
        }
        if record.message.is_deleted {
            return Err(RepositoryError::Conflict(format!(
                "message '{}' is deleted",
                message_id
            )));
        }
        record.message.content = content;
        record.message.is_edited = true;
        record.message.edit_count += 1;
        Ok(record.message.clone())
    }

    async fn delete_message(
        &self,
        message_id: &MessageId,
        sender_id: &UserId,
        _at: Timestamp,
    ) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.lock().await;
        let record = messages
            .get_mut(message_id)
            .ok_or_else(|| not_found("message", message_id.as_str()))?;
        Self::soft_delete(record, sender_id)
    }

    async fn delete_for_everyone(
        &self,
        message_id: &MessageId,
        user_id: &UserId,
        _at: Timestamp,
    ) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.lock().await;
        let record = messages
            .get_mut(message_id)
            .ok_or_else(|| not_found("message", message_id.as_str()))?;
        Self::soft_delete(record, user_id)
    }

    async fn delete_for_user(
        &self,
        message_id: &MessageId,
        user_id: &UserId,
    ) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.lock().await;
        let record = messages
            .get_mut(message_id)
            .ok_or_else(|| not_found("message", message_id.as_str()))?;
        record.hidden_for.insert(user_id.clone());
        Ok(record.message.clone())
    }

    async fn add_reaction(
        &self,
        message_id: &MessageId,
        user_id: &UserId,
        emoji: Emoji,
        at: Timestamp,
    ) -> Result<Vec<Reaction>, RepositoryError> {
        let mut messages = self.messages.lock().await;
        let record = messages
            .get_mut(message_id)
            .ok_or_else(|| not_found("message", message_id.as_str()))?;
        if record.message.is_deleted {
            return Err(RepositoryError::Conflict(format!(
                "message '{}' is deleted",
                message_id
            )));
        }
        record.reactions.retain(|r| &r.user_id != user_id);
        record.reactions.push(Reaction {
            user_id: user_id.clone(),
            emoji,
            reacted_at: at,
        });
        Ok(record.reactions.clone())
    }

    async fn remove_reaction(
        &self,
        message_id: &MessageId,
        user_id: &UserId,
    ) -> Result<Vec<Reaction>, RepositoryError> {
        let mut messages = self.messages.lock().await;
        let record = messages
            .get_mut(message_id)
            .ok_or_else(|| not_found("message", message_id.as_str()))?;
        record.reactions.retain(|r| &r.user_id != user_id);
        Ok(record.reactions.clone())
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn upsert_unread(
        &self,
        upsert: NotificationUpsert,
    ) -> Result<Notification, RepositoryError> {
        // 検索と更新を同じロック内で行う（find-and-update-or-insert）
        let mut notifications = self.notifications.lock().await;
        if let Some(existing) = notifications.iter_mut().find(|n| {
            !n.is_read && n.recipient_id == upsert.recipient_id && n.sender_id == upsert.sender_id
        }) {
            existing.message_count += 1;
            existing.summary = upsert.summary;
            existing.sender_name = upsert.sender_name;
            existing.chat_id = upsert.chat_id;
            existing.latest_content = upsert.content;
            existing.latest_at = upsert.at;
            existing.updated_at = upsert.at;
            return Ok(existing.clone());
        }

        let id =
            NotificationId::new(new_id()).map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let notification = Notification {
            id,
            recipient_id: upsert.recipient_id,
            sender_id: upsert.sender_id,
            sender_name: upsert.sender_name,
            chat_id: upsert.chat_id,
            summary: upsert.summary,
            message_count: 1,
            latest_content: upsert.content,
            latest_at: upsert.at,
            created_at: upsert.at,
            updated_at: upsert.at,
            is_read: false,
            read_at: None,
        };
        notifications.push(notification.clone());
        Ok(notification)
    }

    async fn mark_read(
        &self,
        recipient_id: &UserId,
        notification_id: &NotificationId,
        at: Timestamp,
    ) -> Result<(Notification, bool), RepositoryError> {
        let mut notifications = self.notifications.lock().await;
        let notification = notifications
            .iter_mut()
            .find(|n| &n.id == notification_id && &n.recipient_id == recipient_id)
            .ok_or_else(|| not_found("notification", notification_id.as_str()))?;
        let flipped = !notification.is_read;
        if flipped {
            notification.is_read = true;
            notification.read_at = Some(at);
            notification.updated_at = at;
        }
        Ok((notification.clone(), flipped))
    }

    async fn mark_all_from_sender_read(
        &self,
        recipient_id: &UserId,
        sender_id: &UserId,
        at: Timestamp,
    ) -> Result<u64, RepositoryError> {
        let mut notifications = self.notifications.lock().await;
        let mut count = 0;
        for n in notifications.iter_mut().filter(|n| {
            !n.is_read && &n.recipient_id == recipient_id && &n.sender_id == sender_id
        }) {
            n.is_read = true;
            n.read_at = Some(at);
            n.updated_at = at;
            count += 1;
        }
        Ok(count)
    }

    async fn mark_all_read(
        &self,
        recipient_id: &UserId,
        at: Timestamp,
    ) -> Result<u64, RepositoryError> {
        let mut notifications = self.notifications.lock().await;
        let mut count = 0;
        for n in notifications
            .iter_mut()
            .filter(|n| !n.is_read && &n.recipient_id == recipient_id)
        {
            n.is_read = true;
            n.read_at = Some(at);
            n.updated_at = at;
            count += 1;
        }
        Ok(count)
    }

    async fn unread_count(&self, recipient_id: &UserId) -> Result<u64, RepositoryError> {
        let notifications = self.notifications.lock().await;
        Ok(notifications
            .iter()
            .filter(|n| !n.is_read && &n.recipient_id == recipient_id)
            .count() as u64)
    }

    async fn unread_from_sender(
        &self,
        recipient_id: &UserId,
        sender_id: &UserId,
    ) -> Result<Option<Notification>, RepositoryError> {
        let notifications = self.notifications.lock().await;
        Ok(notifications
            .iter()
            .find(|n| !n.is_read && &n.recipient_id == recipient_id && &n.sender_id == sender_id)
            .cloned())
    }

    async fn active_senders(
        &self,
        recipient_id: &UserId,
    ) -> Result<Vec<ActiveSender>, RepositoryError> {
        let notifications = self.notifications.lock().await;
        let mut by_sender: HashMap<&UserId, ActiveSender> = HashMap::new();
        for n in notifications
            .iter()
            .filter(|n| !n.is_read && &n.recipient_id == recipient_id)
        {
            let entry = by_sender.entry(&n.sender_id).or_insert_with(|| ActiveSender {
                sender_id: n.sender_id.clone(),
                sender_name: n.sender_name.clone(),
                chat_id: n.chat_id.clone(),
                message_count: 0,
                latest_content: n.latest_content.clone(),
                latest_at: n.latest_at,
            });
            entry.message_count += n.message_count;
            if n.latest_at > entry.latest_at {
                entry.sender_name = n.sender_name.clone();
                entry.chat_id = n.chat_id.clone();
                entry.latest_content = n.latest_content.clone();
                entry.latest_at = n.latest_at;
            }
        }
        let mut result: Vec<ActiveSender> = by_sender.into_values().collect();
        result.sort_by(|a, b| b.latest_at.cmp(&a.latest_at));
        Ok(result)
    }

    async fn list(
        &self,
        recipient_id: &UserId,
        limit: usize,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = self.notifications.lock().await;
        let mut result: Vec<Notification> = notifications
            .iter()
            .filter(|n| &n.recipient_id == recipient_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        result.truncate(limit);
        Ok(result)
    }

    async fn delete(
        &self,
        recipient_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), RepositoryError> {
        let mut notifications = self.notifications.lock().await;
        let before = notifications.len();
        notifications.retain(|n| !(&n.id == notification_id && &n.recipient_id == recipient_id));
        if notifications.len() == before {
            return Err(not_found("notification", notification_id.as_str()));
        }
        Ok(())
    }

    async fn delete_read(&self, recipient_id: &UserId) -> Result<u64, RepositoryError> {
        let mut notifications = self.notifications.lock().await;
        let before = notifications.len();
        notifications.retain(|n| !(n.is_read && &n.recipient_id == recipient_id));
        Ok((before - notifications.len()) as u64)
    }

    async fn delete_read_before(&self, cutoff: Timestamp) -> Result<u64, RepositoryError> {
        let mut notifications = self.notifications.lock().await;
        let before = notifications.len();
        notifications.retain(|n| !(n.is_read && n.updated_at < cutoff));
        Ok((before - notifications.len()) as u64)
    }
}
