//! HTTP and WebSocket handlers.

pub mod events;
mod http;
mod websocket;

pub use http::{
    ApiError, AuthUser, USER_ID_HEADER, active_senders, change_theme, chat_statuses, debug_connections,
    delete_message, delete_message_for_everyone, delete_message_for_me, delete_notification,
    delete_read_notifications, edit_message, health_check, list_notifications,
    mark_all_notifications_read, mark_message_read, mark_notification_read, unread_count,
    user_status,
};
pub use websocket::websocket_handler;
