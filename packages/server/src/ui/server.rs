//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::{
    handler::{
        active_senders, change_theme, chat_statuses, debug_connections, delete_message,
        delete_message_for_everyone, delete_message_for_me, delete_notification,
        delete_read_notifications, edit_message, health_check, list_notifications,
        mark_all_notifications_read, mark_message_read, mark_notification_read, unread_count,
        user_status, websocket_handler,
    },
    retention::spawn_retention_cleanup,
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket chat server
///
/// # Example
///
/// ```ignore
/// let state = AppState::new(repos, pusher, clock, settings)?;
/// Server::new(state).run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Build the router with every WebSocket and HTTP endpoint
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/debug/connections", get(debug_connections))
            .route("/api/notifications", get(list_notifications))
            .route("/api/notifications/unread-count", get(unread_count))
            .route("/api/notifications/active-senders", get(active_senders))
            .route("/api/notifications/read-all", post(mark_all_notifications_read))
            .route("/api/notifications/read", delete(delete_read_notifications))
            .route(
                "/api/notifications/{notification_id}",
                delete(delete_notification),
            )
            .route(
                "/api/notifications/{notification_id}/read",
                post(mark_notification_read),
            )
            .route("/api/users/{user_id}/status", get(user_status))
            .route("/api/chats/{chat_id}/statuses", get(chat_statuses))
            .route("/api/chats/{chat_id}/theme", put(change_theme))
            .route(
                "/api/messages/{message_id}",
                put(edit_message).delete(delete_message),
            )
            .route(
                "/api/messages/{message_id}/delete-for-everyone",
                post(delete_message_for_everyone),
            )
            .route(
                "/api/messages/{message_id}/delete-for-me",
                post(delete_message_for_me),
            )
            .route("/api/messages/{message_id}/read", post(mark_message_read))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// The retention task runs for the lifetime of the server and the
    /// connection registry is cleared once serving stops.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let retention = spawn_retention_cleanup(
            self.state.notification_usecase.clone(),
            self.state.settings.cleanup_interval_secs,
        );

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        retention.abort();
        self.state.registry.clear();
        tracing::info!("Server shutdown complete");

        result
    }

    /// Run the WebSocket chat server
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!(
            "WebSocket chat server listening on {}",
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}/ws?user_id=<user>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        Ok(())
    }
}
