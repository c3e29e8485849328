//! HTTP API endpoint handlers.
//!
//! The caller's identity is resolved by the fronting auth layer and arrives in
//! the `x-user-id` header. Handlers delegate to the same use cases as the
//! socket events, so every state change also reaches connected clients.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use crate::{
    domain::{
        ChatId, MessageId, NotificationId, UserId, ValueObjectError,
        event::{NotificationPayload, StatusPayload},
    },
    infrastructure::dto::http::{
        ActiveSenderPayload, ActiveSendersResponse, ChatStatusesResponse, ClearedResponse,
        DebugConnectionsResponse, DeletedResponse, EditMessageRequest,
        ErrorResponse, MarkAllReadRequest, MessageResponse, NotificationListQuery,
        NotificationListResponse, ReadResponse, ThemeRequest, ThemeResponse,
        UnreadCountQuery, UnreadCountResponse,
    },
    ui::state::AppState,
    usecase::ActionError,
};

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller extracted from the `x-user-id` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserId);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        UserId::new(raw.trim().to_string())
            .map(AuthUser)
            .map_err(|_| ApiError::Unauthorized)
    }
}

/// Error returned by the HTTP handlers
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    NotFound(String),
    Conflict(String),
    BadRequest(String),
    Internal,
}

impl From<ActionError> for ApiError {
    fn from(error: ActionError) -> Self {
        match error {
            ActionError::NotFound(what) => Self::NotFound(format!("{} not found", what)),
            ActionError::Conflict(what) => Self::Conflict(what),
            ActionError::Invalid(e) => Self::BadRequest(e.to_string()),
            ActionError::Persistence(e) => {
                tracing::error!("Persistence failure: {}", e);
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            Self::NotFound(what) => (StatusCode::NOT_FOUND, what),
            Self::Conflict(what) => (StatusCode::CONFLICT, what),
            Self::BadRequest(what) => (StatusCode::BAD_REQUEST, what),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Ids in the path that fail validation cannot match any record.
fn path_id<T>(raw: String) -> Result<T, ApiError>
where
    T: TryFrom<String, Error = ValueObjectError>,
{
    T::try_from(raw.clone()).map_err(|_| ApiError::NotFound(format!("'{}' not found", raw)))
}

fn query_user_id(raw: Option<String>) -> Result<Option<UserId>, ApiError> {
    raw.map(UserId::new)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Debug endpoint to get the current connection registry (for testing purposes)
pub async fn debug_connections(
    State(state): State<Arc<AppState>>,
) -> Json<DebugConnectionsResponse> {
    let pusher_channels = state.emitter.pusher().connected_clients().await.len();
    Json(DebugConnectionsResponse {
        registry: state.registry.snapshot(),
        pusher_channels,
    })
}

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let notifications = state
        .notification_usecase
        .list(&user_id, query.limit, query.unread_only)
        .await?;
    let badge = state.notification_usecase.badge(&user_id, None).await?;

    // Domain Model から DTO への変換
    Ok(Json(NotificationListResponse {
        notifications: notifications.iter().map(NotificationPayload::from).collect(),
        unread_count: badge.unread_count,
    }))
}

/// GET /api/notifications/active-senders
pub async fn active_senders(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ActiveSendersResponse>, ApiError> {
    let senders = state.notification_usecase.active_senders(&user_id).await?;
    Ok(Json(ActiveSendersResponse {
        senders: senders.iter().map(ActiveSenderPayload::from).collect(),
    }))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<UnreadCountQuery>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let sender_id = query_user_id(query.sender_id)?;
    let badge = state
        .notification_usecase
        .badge(&user_id, sender_id.as_ref())
        .await?;
    Ok(Json(badge.into()))
}

/// POST /api/notifications/{notification_id}/read
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(notification_id): Path<String>,
) -> Result<Json<NotificationPayload>, ApiError> {
    let notification_id: NotificationId = path_id(notification_id)?;
    let notification = state
        .notification_usecase
        .mark_read(&user_id, &notification_id)
        .await?;
    Ok(Json(NotificationPayload::from(&notification)))
}

/// POST /api/notifications/read-all[?sender_id=...]
pub async fn mark_all_notifications_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(request): Query<MarkAllReadRequest>,
) -> Result<Json<ClearedResponse>, ApiError> {
    let cleared_count = match query_user_id(request.sender_id)? {
        Some(sender_id) => {
            state
                .notification_usecase
                .mark_all_from_sender_read(&user_id, &sender_id)
                .await?
        }
        None => state.notification_usecase.mark_all_read(&user_id).await?,
    };
    Ok(Json(ClearedResponse { cleared_count }))
}

/// DELETE /api/notifications/{notification_id}
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(notification_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let notification_id: NotificationId = path_id(notification_id)?;
    state
        .notification_usecase
        .delete(&user_id, &notification_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/notifications/read
pub async fn delete_read_notifications(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted_count = state.notification_usecase.delete_read(&user_id).await?;
    Ok(Json(DeletedResponse { deleted_count }))
}

/// GET /api/users/{user_id}/status
pub async fn user_status(
    State(state): State<Arc<AppState>>,
    AuthUser(_caller): AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<StatusPayload>, ApiError> {
    let user_id: UserId = path_id(user_id)?;
    let status = state.presence_query_usecase.user_status(&user_id).await?;
    Ok(Json(StatusPayload::from(&status)))
}

/// GET /api/chats/{chat_id}/statuses
pub async fn chat_statuses(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatStatusesResponse>, ApiError> {
    let chat_id: ChatId = path_id(chat_id)?;
    let statuses = state
        .presence_query_usecase
        .chat_statuses(&user_id, &chat_id)
        .await?;
    Ok(Json(ChatStatusesResponse {
        chat_id,
        statuses: statuses.iter().map(StatusPayload::from).collect(),
    }))
}

/// PUT /api/chats/{chat_id}/theme
pub async fn change_theme(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(chat_id): Path<String>,
    Json(request): Json<ThemeRequest>,
) -> Result<Json<ThemeResponse>, ApiError> {
    let chat_id: ChatId = path_id(chat_id)?;
    let theme = state
        .theme_usecase
        .change(&user_id, &chat_id, &request.theme_name)
        .await?;
    Ok(Json(ThemeResponse {
        chat_id,
        theme_name: theme.as_str().to_string(),
    }))
}

/// PUT /api/messages/{message_id}
pub async fn edit_message(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(message_id): Path<String>,
    Json(request): Json<EditMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message_id: MessageId = path_id(message_id)?;
    let message = state
        .message_lifecycle_usecase
        .edit(&user_id, &message_id, request.content)
        .await?;
    Ok(Json(MessageResponse::from(&message)))
}

/// DELETE /api/messages/{message_id}
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(message_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message_id: MessageId = path_id(message_id)?;
    let message = state
        .message_lifecycle_usecase
        .delete(&user_id, &message_id)
        .await?;
    Ok(Json(MessageResponse::from(&message)))
}

/// POST /api/messages/{message_id}/delete-for-everyone
pub async fn delete_message_for_everyone(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(message_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message_id: MessageId = path_id(message_id)?;
    let message = state
        .message_lifecycle_usecase
        .delete_for_everyone(&user_id, &message_id)
        .await?;
    Ok(Json(MessageResponse::from(&message)))
}

/// POST /api/messages/{message_id}/delete-for-me
pub async fn delete_message_for_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(message_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let message_id: MessageId = path_id(message_id)?;
    state
        .message_lifecycle_usecase
        .delete_for_me(&user_id, &message_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/messages/{message_id}/read
pub async fn mark_message_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(message_id): Path<String>,
) -> Result<Json<ReadResponse>, ApiError> {
    let message_id: MessageId = path_id(message_id)?;
    let receipt_sent = state
        .read_receipt_usecase
        .execute(&message_id, &user_id)
        .await?;
    Ok(Json(ReadResponse { receipt_sent }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_error_maps_to_status() {
        // テスト項目: ActionError が対応する HTTP ステータスに変換される
        // given (前提条件):
        let cases = vec![
            (ActionError::NotFound("message".into()), StatusCode::NOT_FOUND),
            (ActionError::Conflict("deleted".into()), StatusCode::CONFLICT),
            (
                ActionError::Invalid(ValueObjectError::Empty("content")),
                StatusCode::BAD_REQUEST,
            ),
            (
                ActionError::Persistence("disk full".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            // when (操作):
            let response = ApiError::from(error).into_response();

            // then (期待する結果):
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_invalid_path_id_is_not_found() {
        // テスト項目: 形式不正なパス ID は 404 扱いになる
        // given (前提条件):
        let raw = "   ".to_string();

        // when (操作):
        let result: Result<MessageId, ApiError> = path_id(raw);

        // then (期待する結果):
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
