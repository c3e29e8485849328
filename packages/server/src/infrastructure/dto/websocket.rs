//! WebSocket inbound DTOs.
//!
//! Every frame is `{"event": "<name>", "data": {...}}`. The frame is parsed
//! first, then `data` is decoded into the payload type of the named event.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{FileMetadata, MessageKind};

/// Raw inbound frame
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// `join_chat` / `leave_chat` / `request_initial_statuses`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRef {
    pub chat_id: String,
}

/// `send_message`
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessagePayload {
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub file: Option<FileMetadata>,
}

/// `typing`
#[derive(Debug, Clone, Deserialize)]
pub struct TypingPayload {
    pub chat_id: String,
    #[serde(default)]
    pub is_typing: bool,
}

/// `message_read` / `reaction_removed`
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRef {
    pub message_id: String,
}

/// `reaction_added`
#[derive(Debug, Clone, Deserialize)]
pub struct ReactionAddedPayload {
    pub message_id: String,
    pub emoji: String,
}

/// `mark_notification_read`
///
/// Either a notification id, or a sender id to mark that sender's unread row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkNotificationReadPayload {
    #[serde(default)]
    pub notification_id: Option<String>,
    #[serde(default)]
    pub sender_id: Option<String>,
}

/// `mark_all_message_notifications_read`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkAllNotificationsReadPayload {
    #[serde(default)]
    pub sender_id: Option<String>,
}

/// Decode an event payload, treating a missing `data` as an empty object.
pub fn decode_payload<T: serde::de::DeserializeOwned>(data: Value) -> serde_json::Result<T> {
    match data {
        Value::Null => serde_json::from_value(Value::Object(Default::default())),
        other => serde_json::from_value(other),
    }
}
