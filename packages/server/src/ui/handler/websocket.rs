//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionIdFactory, UserId},
    ui::{
        dispatcher::{ConnectionContext, DispatcherError},
        state::AppState,
    },
};

/// Query parameters for WebSocket connection
///
/// `user_id` is resolved by the fronting auth layer. Absent or invalid keeps
/// the connection unauthenticated.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_id: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> impl IntoResponse {
    let identity = query
        .user_id
        .and_then(|raw| match UserId::try_from(raw.clone()) {
            Ok(user_id) => Some(user_id),
            Err(_) => {
                tracing::warn!("Invalid user_id format: '{}'", raw);
                None
            }
        });

    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// The task ends when the channel closes or the socket stops accepting writes.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, identity: Option<UserId>) {
    let connection_id = ConnectionIdFactory::generate();
    let (sender, mut receiver) = socket.split();

    // Outbound channel for this connection
    let (tx, rx) = mpsc::unbounded_channel();
    state
        .connect_client_usecase
        .attach(connection_id.clone(), tx)
        .await;

    let mut ctx = ConnectionContext::new(connection_id, identity);
    state.dispatcher.on_connect(&state, &mut ctx).await;

    let mut send_task = pusher_loop(rx, sender);

    loop {
        tokio::select! {
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = state.dispatcher.dispatch(&state, &mut ctx, text.as_str()).await {
                            log_dispatch_error(&ctx, &e);
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(connection_id = %ctx.connection_id, "Client requested close");
                        break;
                    }
                    // Ping/pong is handled automatically by the WebSocket protocol
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!(connection_id = %ctx.connection_id, "WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut send_task => break,
        }
    }

    send_task.abort();
    state.dispatcher.on_disconnect(&state, &mut ctx).await;
}

fn log_dispatch_error(ctx: &ConnectionContext, error: &DispatcherError) {
    match error {
        DispatcherError::Unauthenticated(_) | DispatcherError::Closed => {
            tracing::debug!(connection_id = %ctx.connection_id, "Dropped event: {}", error);
        }
        _ => {
            tracing::warn!(connection_id = %ctx.connection_id, "Rejected frame: {}", error);
        }
    }
}
