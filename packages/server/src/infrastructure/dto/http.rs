//! HTTP API request and response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::{
    ActiveSender, ChatId, MessageId, RegistrySnapshot, Timestamp, UserId,
    event::{NotificationPayload, StatusPayload},
};

/// `GET /debug/connections`
#[derive(Debug, Clone, Serialize)]
pub struct DebugConnectionsResponse {
    #[serde(flatten)]
    pub registry: RegistrySnapshot,
    /// Connections that still hold an outbound channel
    pub pusher_channels: usize,
}

/// `GET /api/notifications`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationListQuery {
    pub limit: Option<usize>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationPayload>,
    pub unread_count: u64,
}

/// `GET /api/notifications/active-senders`
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSendersResponse {
    pub senders: Vec<ActiveSenderPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSenderPayload {
    pub sender_id: UserId,
    pub sender_name: String,
    pub chat_id: ChatId,
    pub message_count: u32,
    pub latest_content: String,
    pub latest_timestamp: Timestamp,
}

impl From<&ActiveSender> for ActiveSenderPayload {
    fn from(sender: &ActiveSender) -> Self {
        Self {
            sender_id: sender.sender_id.clone(),
            sender_name: sender.sender_name.clone(),
            chat_id: sender.chat_id.clone(),
            message_count: sender.message_count,
            latest_content: sender.latest_content.clone(),
            latest_timestamp: sender.latest_at,
        }
    }
}

/// `GET /api/notifications/unread-count`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnreadCountQuery {
    pub sender_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_message_count: Option<u32>,
}

/// `POST /api/notifications/read-all`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkAllReadRequest {
    #[serde(default)]
    pub sender_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearedResponse {
    pub cleared_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedResponse {
    pub deleted_count: u64,
}

/// `PUT /api/messages/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageResponse {
    pub message_id: MessageId,
    pub chat_id: ChatId,
    pub content: String,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub edit_count: u32,
}

/// `POST /api/messages/{id}/read`
#[derive(Debug, Clone, Serialize)]
pub struct ReadResponse {
    pub receipt_sent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatStatusesResponse {
    pub chat_id: ChatId,
    pub statuses: Vec<StatusPayload>,
}

/// `PUT /api/chats/{id}/theme`
#[derive(Debug, Clone, Deserialize)]
pub struct ThemeRequest {
    pub theme_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThemeResponse {
    pub chat_id: ChatId,
    pub theme_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
