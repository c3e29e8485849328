//! WebSocket event handlers registered in the dispatcher table.
//!
//! Each handler decodes its payload, converts ids into domain value objects
//! and calls the matching use case. Failures are logged with the connection,
//! user and event; only `send_message` answers input errors to the client.

use std::fmt::Display;

use futures_util::{FutureExt, future::BoxFuture};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    domain::{ChatId, MessageId, NotificationId, ServerEvent, UserId, ValueObjectError},
    infrastructure::dto::websocket::{
        ChatRef, MarkAllNotificationsReadPayload, MarkNotificationReadPayload, MessageRef,
        ReactionAddedPayload, SendMessagePayload, TypingPayload, decode_payload,
    },
    ui::{
        dispatcher::{ConnectionContext, EventHandler},
        state::AppState,
    },
    usecase::PresenceError,
};

/// The production handler table
pub fn handler_table() -> Vec<(&'static str, EventHandler)> {
    vec![
        ("connect", connect as EventHandler),
        ("disconnect", disconnect as EventHandler),
        ("join_chat", join_chat as EventHandler),
        ("leave_chat", leave_chat as EventHandler),
        ("send_message", send_message as EventHandler),
        ("typing", typing as EventHandler),
        ("message_read", message_read as EventHandler),
        ("request_notifications", request_notifications as EventHandler),
        ("mark_notification_read", mark_notification_read as EventHandler),
        (
            "mark_all_message_notifications_read",
            mark_all_message_notifications_read as EventHandler,
        ),
        ("reaction_added", reaction_added as EventHandler),
        ("reaction_removed", reaction_removed as EventHandler),
        ("request_initial_statuses", request_initial_statuses as EventHandler),
    ]
}

fn decode<T: DeserializeOwned>(event: &str, ctx: &ConnectionContext, data: Value) -> Option<T> {
    match decode_payload(data) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::warn!(
                connection_id = %ctx.connection_id,
                event,
                "Invalid payload: {}",
                e
            );
            None
        }
    }
}

fn parse_id<T>(event: &str, ctx: &ConnectionContext, raw: String) -> Option<T>
where
    T: TryFrom<String, Error = ValueObjectError>,
{
    match T::try_from(raw) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(connection_id = %ctx.connection_id, event, "Invalid id: {}", e);
            None
        }
    }
}

fn log_failure(event: &str, ctx: &ConnectionContext, user_id: &UserId, error: impl Display) {
    tracing::warn!(
        connection_id = %ctx.connection_id,
        user_id = %user_id,
        event,
        "Event failed: {}",
        error
    );
}

fn connect<'a>(
    state: &'a AppState,
    ctx: &'a mut ConnectionContext,
    _data: Value,
) -> BoxFuture<'a, ()> {
    async move {
        let Some(user_id) = ctx.identity().cloned() else {
            tracing::info!(connection_id = %ctx.connection_id, "Unauthenticated connection opened");
            return;
        };
        match state
            .connect_client_usecase
            .authenticate(&ctx.connection_id, user_id.clone())
            .await
        {
            Ok(change) => {
                tracing::info!(
                    connection_id = %ctx.connection_id,
                    user_id = %user_id,
                    ?change,
                    "Connection authenticated"
                );
                ctx.authenticate(user_id);
            }
            Err(PresenceError::Persistence(e)) => {
                // レジストリへの登録は済んでいる
                tracing::error!(user_id = %user_id, "Failed to persist online status: {}", e);
                ctx.authenticate(user_id);
            }
            Err(e) => {
                tracing::warn!(connection_id = %ctx.connection_id, "Authentication failed: {}", e);
            }
        }
    }
    .boxed()
}

fn disconnect<'a>(
    state: &'a AppState,
    ctx: &'a mut ConnectionContext,
    _data: Value,
) -> BoxFuture<'a, ()> {
    async move {
        match state
            .disconnect_client_usecase
            .execute(&ctx.connection_id)
            .await
        {
            Ok(closed) => {
                tracing::info!(
                    connection_id = %ctx.connection_id,
                    rooms = closed.rooms.len(),
                    "Connection closed"
                );
            }
            Err(e) => {
                tracing::error!(connection_id = %ctx.connection_id, "Disconnect failed: {}", e);
            }
        }
    }
    .boxed()
}

fn join_chat<'a>(
    state: &'a AppState,
    ctx: &'a mut ConnectionContext,
    data: Value,
) -> BoxFuture<'a, ()> {
    async move {
        let Some(user_id) = ctx.user_id().cloned() else {
            return;
        };
        let Some(payload) = decode::<ChatRef>("join_chat", ctx, data) else {
            return;
        };
        let Some(chat_id) = parse_id::<ChatId>("join_chat", ctx, payload.chat_id) else {
            return;
        };
        if let Err(e) = state
            .room_membership_usecase
            .join(&ctx.connection_id, &user_id, &chat_id)
            .await
        {
            log_failure("join_chat", ctx, &user_id, e);
        }
    }
    .boxed()
}

fn leave_chat<'a>(
    state: &'a AppState,
    ctx: &'a mut ConnectionContext,
    data: Value,
) -> BoxFuture<'a, ()> {
    async move {
        let Some(payload) = decode::<ChatRef>("leave_chat", ctx, data) else {
            return;
        };
        let Some(chat_id) = parse_id::<ChatId>("leave_chat", ctx, payload.chat_id) else {
            return;
        };
        state
            .room_membership_usecase
            .leave(&ctx.connection_id, &chat_id);
    }
    .boxed()
}

fn send_message<'a>(
    state: &'a AppState,
    ctx: &'a mut ConnectionContext,
    data: Value,
) -> BoxFuture<'a, ()> {
    async move {
        let Some(user_id) = ctx.user_id().cloned() else {
            return;
        };
        let payload = match decode_payload::<SendMessagePayload>(data) {
            Ok(payload) => payload,
            Err(e) => {
                log_failure("send_message", ctx, &user_id, &e);
                state
                    .emitter
                    .to_connection(
                        &ctx.connection_id,
                        &ServerEvent::message_error("Invalid message payload", None),
                    )
                    .await;
                return;
            }
        };
        // 失敗時の message_error はユースケースが返す
        let _ = state
            .send_message_usecase
            .execute(&ctx.connection_id, &user_id, payload.into())
            .await;
    }
    .boxed()
}

fn typing<'a>(
    state: &'a AppState,
    ctx: &'a mut ConnectionContext,
    data: Value,
) -> BoxFuture<'a, ()> {
    async move {
        let Some(user_id) = ctx.user_id().cloned() else {
            return;
        };
        let Some(payload) = decode::<TypingPayload>("typing", ctx, data) else {
            return;
        };
        let Some(chat_id) = parse_id::<ChatId>("typing", ctx, payload.chat_id) else {
            return;
        };
        state
            .typing_usecase
            .execute(&ctx.connection_id, &user_id, &chat_id, payload.is_typing)
            .await;
    }
    .boxed()
}

fn message_read<'a>(
    state: &'a AppState,
    ctx: &'a mut ConnectionContext,
    data: Value,
) -> BoxFuture<'a, ()> {
    async move {
        let Some(user_id) = ctx.user_id().cloned() else {
            return;
        };
        let Some(payload) = decode::<MessageRef>("message_read", ctx, data) else {
            return;
        };
        let Some(message_id) = parse_id::<MessageId>("message_read", ctx, payload.message_id)
        else {
            return;
        };
        if let Err(e) = state
            .read_receipt_usecase
            .execute(&message_id, &user_id)
            .await
        {
            log_failure("message_read", ctx, &user_id, e);
        }
    }
    .boxed()
}

fn request_notifications<'a>(
    state: &'a AppState,
    ctx: &'a mut ConnectionContext,
    _data: Value,
) -> BoxFuture<'a, ()> {
    async move {
        let Some(user_id) = ctx.user_id().cloned() else {
            return;
        };
        if let Err(e) = state
            .notification_usecase
            .request_notifications(&ctx.connection_id, &user_id)
            .await
        {
            log_failure("request_notifications", ctx, &user_id, e);
        }
    }
    .boxed()
}

fn mark_notification_read<'a>(
    state: &'a AppState,
    ctx: &'a mut ConnectionContext,
    data: Value,
) -> BoxFuture<'a, ()> {
    async move {
        const EVENT: &str = "mark_notification_read";
        let Some(user_id) = ctx.user_id().cloned() else {
            return;
        };
        let Some(payload) = decode::<MarkNotificationReadPayload>(EVENT, ctx, data) else {
            return;
        };
        let result = match (payload.notification_id, payload.sender_id) {
            (Some(id), _) => {
                let Some(id) = parse_id::<NotificationId>(EVENT, ctx, id) else {
                    return;
                };
                state
                    .notification_usecase
                    .mark_read(&user_id, &id)
                    .await
                    .map(|_| ())
            }
            (None, Some(sender)) => {
                let Some(sender) = parse_id::<UserId>(EVENT, ctx, sender) else {
                    return;
                };
                state
                    .notification_usecase
                    .mark_all_from_sender_read(&user_id, &sender)
                    .await
                    .map(|_| ())
            }
            (None, None) => {
                log_failure(EVENT, ctx, &user_id, "notification_id or sender_id is required");
                return;
            }
        };
        if let Err(e) = result {
            log_failure(EVENT, ctx, &user_id, e);
        }
    }
    .boxed()
}

fn mark_all_message_notifications_read<'a>(
    state: &'a AppState,
    ctx: &'a mut ConnectionContext,
    data: Value,
) -> BoxFuture<'a, ()> {
    async move {
        const EVENT: &str = "mark_all_message_notifications_read";
        let Some(user_id) = ctx.user_id().cloned() else {
            return;
        };
        let Some(payload) = decode::<MarkAllNotificationsReadPayload>(EVENT, ctx, data) else {
            return;
        };
        let result = match payload.sender_id {
            Some(sender) => {
                let Some(sender) = parse_id::<UserId>(EVENT, ctx, sender) else {
                    return;
                };
                state
                    .notification_usecase
                    .mark_all_from_sender_read(&user_id, &sender)
                    .await
            }
            None => state.notification_usecase.mark_all_read(&user_id).await,
        };
        if let Err(e) = result {
            log_failure(EVENT, ctx, &user_id, e);
        }
    }
    .boxed()
}

fn reaction_added<'a>(
    state: &'a AppState,
    ctx: &'a mut ConnectionContext,
    data: Value,
) -> BoxFuture<'a, ()> {
    async move {
        let Some(user_id) = ctx.user_id().cloned() else {
            return;
        };
        let Some(payload) = decode::<ReactionAddedPayload>("reaction_added", ctx, data) else {
            return;
        };
        let Some(message_id) = parse_id::<MessageId>("reaction_added", ctx, payload.message_id)
        else {
            return;
        };
        if let Err(e) = state
            .reaction_usecase
            .add(&ctx.connection_id, &user_id, &message_id, payload.emoji)
            .await
        {
            log_failure("reaction_added", ctx, &user_id, e);
        }
    }
    .boxed()
}

fn reaction_removed<'a>(
    state: &'a AppState,
    ctx: &'a mut ConnectionContext,
    data: Value,
) -> BoxFuture<'a, ()> {
    async move {
        let Some(user_id) = ctx.user_id().cloned() else {
            return;
        };
        let Some(payload) = decode::<MessageRef>("reaction_removed", ctx, data) else {
            return;
        };
        let Some(message_id) = parse_id::<MessageId>("reaction_removed", ctx, payload.message_id)
        else {
            return;
        };
        if let Err(e) = state
            .reaction_usecase
            .remove(&ctx.connection_id, &user_id, &message_id)
            .await
        {
            log_failure("reaction_removed", ctx, &user_id, e);
        }
    }
    .boxed()
}

fn request_initial_statuses<'a>(
    state: &'a AppState,
    ctx: &'a mut ConnectionContext,
    data: Value,
) -> BoxFuture<'a, ()> {
    async move {
        const EVENT: &str = "request_initial_statuses";
        let Some(user_id) = ctx.user_id().cloned() else {
            return;
        };
        let Some(payload) = decode::<ChatRef>(EVENT, ctx, data) else {
            return;
        };
        let Some(chat_id) = parse_id::<ChatId>(EVENT, ctx, payload.chat_id) else {
            return;
        };
        if let Err(e) = state
            .presence_query_usecase
            .send_initial_statuses(&ctx.connection_id, &user_id, &chat_id)
            .await
        {
            log_failure(EVENT, ctx, &user_id, e);
        }
    }
    .boxed()
}
