//! Conversion logic between DTOs and domain / use-case types.

use crate::{
    domain::Message,
    infrastructure::dto::{http, websocket},
    usecase::{NotificationBadge, SendMessageRequest},
};

// ========================================
// DTO → Domain / UseCase
// ========================================

impl From<websocket::SendMessagePayload> for SendMessageRequest {
    fn from(dto: websocket::SendMessagePayload) -> Self {
        Self {
            chat_id: dto.chat_id,
            content: dto.message,
            kind: dto.kind,
            file: dto.file,
        }
    }
}

// ========================================
// Domain / UseCase → DTO
// ========================================

impl From<&Message> for http::MessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            message_id: message.id.clone(),
            chat_id: message.chat_id.clone(),
            content: message.content.clone(),
            is_deleted: message.is_deleted,
            is_edited: message.is_edited,
            edit_count: message.edit_count,
        }
    }
}

impl From<NotificationBadge> for http::UnreadCountResponse {
    fn from(badge: NotificationBadge) -> Self {
        Self {
            unread_count: badge.unread_count,
            sender_message_count: badge.sender_message_count,
        }
    }
}
