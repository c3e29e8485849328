//! Event dispatcher for inbound WebSocket frames.
//!
//! Handlers are registered in an explicit table keyed by event name. The table
//! is validated when the dispatcher is built: every inbound event must have
//! exactly one handler, so a missing handler is a startup error rather than a
//! silently ignored event at runtime.
//!
//! `connect` and `disconnect` are lifecycle events. They are driven by the
//! transport (socket opened / socket closed) and are rejected when a client
//! sends them as frames.

use std::collections::HashMap;

use futures_util::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use crate::{
    domain::{ConnectionId, UserId},
    infrastructure::dto::websocket::InboundFrame,
};

use super::state::AppState;

/// Every event name the dispatcher must handle.
pub const INBOUND_EVENTS: [&str; 13] = [
    "connect",
    "disconnect",
    "join_chat",
    "leave_chat",
    "send_message",
    "typing",
    "message_read",
    "request_notifications",
    "mark_notification_read",
    "mark_all_message_notifications_read",
    "reaction_added",
    "reaction_removed",
    "request_initial_statuses",
];

/// Events only the transport may trigger.
pub const LIFECYCLE_EVENTS: [&str; 2] = ["connect", "disconnect"];

pub type EventHandler =
    for<'a> fn(&'a AppState, &'a mut ConnectionContext, Value) -> BoxFuture<'a, ()>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatcherError {
    #[error("no handler registered for event '{0}'")]
    MissingHandler(&'static str),
    #[error("event '{0}' registered more than once")]
    DuplicateHandler(&'static str),
    #[error("unknown event '{0}'")]
    UnknownEvent(String),
    #[error("lifecycle event '{0}' cannot be sent by a client")]
    ReservedEvent(String),
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("event '{0}' requires an authenticated connection")]
    Unauthenticated(String),
    #[error("connection is closed")]
    Closed,
}

/// Per-connection session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(UserId),
    Closed,
}

/// State carried by one connection's receive loop.
#[derive(Debug)]
pub struct ConnectionContext {
    pub connection_id: ConnectionId,
    /// Identity resolved by the transport layer before the socket was accepted
    identity: Option<UserId>,
    session: SessionState,
}

impl ConnectionContext {
    pub fn new(connection_id: ConnectionId, identity: Option<UserId>) -> Self {
        Self {
            connection_id,
            identity,
            session: SessionState::Unauthenticated,
        }
    }

    pub fn identity(&self) -> Option<&UserId> {
        self.identity.as_ref()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// The authenticated user, if any
    pub fn user_id(&self) -> Option<&UserId> {
        match &self.session {
            SessionState::Authenticated(user_id) => Some(user_id),
            _ => None,
        }
    }

    pub fn authenticate(&mut self, user_id: UserId) {
        if self.session == SessionState::Unauthenticated {
            self.session = SessionState::Authenticated(user_id);
        }
    }

    pub fn close(&mut self) {
        self.session = SessionState::Closed;
    }
}

pub struct EventDispatcher {
    handlers: HashMap<&'static str, EventHandler>,
}

impl EventDispatcher {
    /// Build the dispatcher from a handler table.
    pub fn new(table: Vec<(&'static str, EventHandler)>) -> Result<Self, DispatcherError> {
        let mut handlers = HashMap::with_capacity(table.len());
        for (name, handler) in table {
            if !INBOUND_EVENTS.contains(&name) {
                return Err(DispatcherError::UnknownEvent(name.to_string()));
            }
            if handlers.insert(name, handler).is_some() {
                return Err(DispatcherError::DuplicateHandler(name));
            }
        }
        if let Some(missing) = INBOUND_EVENTS
            .into_iter()
            .find(|name| !handlers.contains_key(*name))
        {
            return Err(DispatcherError::MissingHandler(missing));
        }
        Ok(Self { handlers })
    }

    #[cfg(test)]
    pub fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Run the `connect` lifecycle handler.
    pub async fn on_connect(&self, state: &AppState, ctx: &mut ConnectionContext) {
        self.run("connect", state, ctx, Value::Null).await;
    }

    /// Run the `disconnect` lifecycle handler. Always leaves the context closed.
    pub async fn on_disconnect(&self, state: &AppState, ctx: &mut ConnectionContext) {
        self.run("disconnect", state, ctx, Value::Null).await;
        ctx.close();
    }

    /// Decode one inbound text frame and route it to its handler.
    ///
    /// Events from unauthenticated connections are dropped without reaching a
    /// handler; the caller only logs the returned error.
    pub async fn dispatch(
        &self,
        state: &AppState,
        ctx: &mut ConnectionContext,
        text: &str,
    ) -> Result<(), DispatcherError> {
        let frame: InboundFrame = serde_json::from_str(text)
            .map_err(|e| DispatcherError::MalformedFrame(e.to_string()))?;

        if LIFECYCLE_EVENTS.contains(&frame.event.as_str()) {
            return Err(DispatcherError::ReservedEvent(frame.event));
        }
        let handler = *self
            .handlers
            .get(frame.event.as_str())
            .ok_or_else(|| DispatcherError::UnknownEvent(frame.event.clone()))?;

        match ctx.session() {
            SessionState::Authenticated(_) => {}
            SessionState::Unauthenticated => {
                return Err(DispatcherError::Unauthenticated(frame.event));
            }
            SessionState::Closed => return Err(DispatcherError::Closed),
        }

        tracing::debug!(
            connection_id = %ctx.connection_id,
            event = %frame.event,
            "Dispatching event"
        );
        handler(state, ctx, frame.data).await;
        Ok(())
    }

    async fn run(&self, name: &str, state: &AppState, ctx: &mut ConnectionContext, data: Value) {
        if let Some(handler) = self.handlers.get(name) {
            handler(state, ctx, data).await;
        }
    }
}
