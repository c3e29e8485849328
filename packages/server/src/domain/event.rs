//! 送信イベントモデル
//!
//! サーバーからクライアントへ送るイベントを 1 つの enum で表現します。
//! ワイヤー形式は `{"event": "<name>", "data": {...}}`。

use serde::Serialize;

use super::{
    entity::{Message, Notification, ParticipantStatus, Reaction},
    value_object::{ChatId, MessageId, MessageKind, Timestamp, UserId, UserStatus},
};

/// `new_message` のペイロード
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagePayload {
    pub message_id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub sender_username: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<super::entity::FileMetadata>,
}

impl MessagePayload {
    pub fn from_message(message: &Message, sender_username: String) -> Self {
        Self {
            message_id: message.id.clone(),
            chat_id: message.chat_id.clone(),
            sender_id: message.sender_id.clone(),
            sender_username,
            content: message.content.clone(),
            kind: message.kind,
            timestamp: message.created_at.to_rfc3339(),
            file: message.file.clone(),
        }
    }
}

/// 集約通知のワイヤー表現
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub notification_id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
    pub sender_id: UserId,
    pub sender_name: String,
    pub chat_id: ChatId,
    pub message_count: u32,
    pub latest_content: String,
    pub latest_timestamp: String,
    pub is_read: bool,
    pub created_at: String,
}

impl From<&Notification> for NotificationPayload {
    fn from(notification: &Notification) -> Self {
        Self {
            notification_id: notification.id.as_str().to_string(),
            kind: "new_message",
            message: notification.summary.clone(),
            sender_id: notification.sender_id.clone(),
            sender_name: notification.sender_name.clone(),
            chat_id: notification.chat_id.clone(),
            message_count: notification.message_count,
            latest_content: notification.latest_content.clone(),
            latest_timestamp: notification.latest_at.to_rfc3339(),
            is_read: notification.is_read,
            created_at: notification.created_at.to_rfc3339(),
        }
    }
}

/// リアクションのワイヤー表現
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionPayload {
    pub user_id: UserId,
    pub emoji: String,
    pub reacted_at: String,
}

impl From<&Reaction> for ReactionPayload {
    fn from(reaction: &Reaction) -> Self {
        Self {
            user_id: reaction.user_id.clone(),
            emoji: reaction.emoji.as_str().to_string(),
            reacted_at: reaction.reacted_at.to_rfc3339(),
        }
    }
}

/// 参加者ステータスのワイヤー表現
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusPayload {
    pub user_id: UserId,
    pub status: UserStatus,
    pub username: String,
    pub last_seen: Option<String>,
}

impl From<&ParticipantStatus> for StatusPayload {
    fn from(status: &ParticipantStatus) -> Self {
        Self {
            user_id: status.user_id.clone(),
            status: status.status,
            username: status.username.clone(),
            last_seen: status.last_seen.map(|t| t.to_rfc3339()),
        }
    }
}

/// リアクション操作の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Added,
    Removed,
}

/// サーバー送信イベント
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    UserOnline {
        user_id: UserId,
    },
    UserOffline {
        user_id: UserId,
        last_seen: String,
    },
    NewMessage(MessagePayload),
    MessageError {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        chat_id: Option<String>,
        /// メッセージ自体は保存済みの場合の ID（再送すると重複する）
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<MessageId>,
    },
    NotificationUpdated {
        #[serde(rename = "type")]
        kind: &'static str,
        notification: NotificationPayload,
    },
    NotificationBadgeUpdated {
        unread_count: u64,
    },
    NotificationsCleared {
        sender_id: Option<UserId>,
        cleared_count: u64,
        cleared_at: String,
    },
    UserTyping {
        chat_id: ChatId,
        user_id: UserId,
        username: String,
        is_typing: bool,
    },
    MessageReadReceipt {
        message_id: MessageId,
        reader_id: UserId,
        chat_id: ChatId,
        read_at: String,
    },
    NotificationsData {
        notifications: Vec<NotificationPayload>,
        unread_count: u64,
    },
    ReactionUpdated {
        message_id: MessageId,
        chat_id: ChatId,
        user_id: UserId,
        #[serde(skip_serializing_if = "Option::is_none")]
        emoji: Option<String>,
        action: ReactionAction,
        reactions: Vec<ReactionPayload>,
    },
    InitialStatuses {
        chat_id: ChatId,
        statuses: Vec<StatusPayload>,
    },
    ThemeUpdated {
        chat_id: ChatId,
        theme_name: String,
        updated_by: UserId,
        updated_at: String,
    },
    MessageUpdated {
        message_id: MessageId,
        chat_id: ChatId,
        new_content: String,
        edit_count: u32,
        edited_at: String,
    },
    MessageDeleted {
        message_id: MessageId,
        chat_id: ChatId,
    },
    MessageDeletedForEveryone {
        message_id: MessageId,
        chat_id: ChatId,
        deleted_by: UserId,
    },
    MessageDeletedForUser {
        message_id: MessageId,
        user_id: UserId,
    },
}

impl ServerEvent {
    /// `notification_updated` イベントを生成
    pub fn notification_updated(notification: &Notification) -> Self {
        Self::NotificationUpdated {
            kind: "new_message",
            notification: notification.into(),
        }
    }

    pub fn message_error(error: impl Into<String>, chat_id: Option<&str>) -> Self {
        Self::MessageError {
            error: error.into(),
            chat_id: chat_id.map(str::to_string),
            message_id: None,
        }
    }

    /// 保存済みメッセージの ID を `message_error` に添える
    pub fn with_message_id(self, id: Option<&MessageId>) -> Self {
        match self {
            Self::MessageError { error, chat_id, .. } => Self::MessageError {
                error,
                chat_id,
                message_id: id.cloned(),
            },
            other => other,
        }
    }

    pub fn notifications_cleared(
        sender_id: Option<UserId>,
        cleared_count: u64,
        cleared_at: Timestamp,
    ) -> Self {
        Self::NotificationsCleared {
            sender_id,
            cleared_count,
            cleared_at: cleared_at.to_rfc3339(),
        }
    }

    /// ワイヤー上のイベント名
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserOnline { .. } => "user_online",
            Self::UserOffline { .. } => "user_offline",
            Self::NewMessage(_) => "new_message",
            Self::MessageError { .. } => "message_error",
            Self::NotificationUpdated { .. } => "notification_updated",
            Self::NotificationBadgeUpdated { .. } => "notification_badge_updated",
            Self::NotificationsCleared { .. } => "notifications_cleared",
            Self::UserTyping { .. } => "user_typing",
            Self::MessageReadReceipt { .. } => "message_read_receipt",
            Self::NotificationsData { .. } => "notifications_data",
            Self::ReactionUpdated { .. } => "reaction_updated",
            Self::InitialStatuses { .. } => "initial_statuses",
            Self::ThemeUpdated { .. } => "theme_updated",
            Self::MessageUpdated { .. } => "message_updated",
            Self::MessageDeleted { .. } => "message_deleted",
            Self::MessageDeletedForEveryone { .. } => "message_deleted_for_everyone",
            Self::MessageDeletedForUser { .. } => "message_deleted_for_user",
        }
    }

    /// JSON 文字列にシリアライズ
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
