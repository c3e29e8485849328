//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{MessageId, RepositoryError, ValueObjectError};

/// 接続・切断に伴うプレゼンス更新のエラー
#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("connection '{0}' is not open")]
    ConnectionNotOpen(String),
    #[error("failed to persist presence: {0}")]
    Persistence(#[from] RepositoryError),
}

/// メッセージ送信（ファンアウト）のエラー
#[derive(Debug, Error)]
pub enum SendMessageError {
    #[error("chat_id is required")]
    MissingChatId,
    #[error("invalid message: {0}")]
    InvalidMessage(#[from] ValueObjectError),
    #[error("chat '{0}' not found")]
    ChatNotFound(String),
    #[error("failed to persist message: {0}")]
    MessagePersistence(RepositoryError),
    /// メッセージは保存済みで、通知の更新だけが失敗した
    #[error("failed to update notifications for message '{message_id}': {source}")]
    NotificationPersistence {
        message_id: MessageId,
        source: RepositoryError,
    },
}

impl SendMessageError {
    /// 送信者に返す `message_error` の本文
    ///
    /// 永続化エラーの詳細はログにだけ残し、クライアントには出さない。
    pub fn client_message(&self) -> String {
        match self {
            Self::MissingChatId | Self::InvalidMessage(_) | Self::ChatNotFound(_) => {
                self.to_string()
            }
            Self::MessagePersistence(_) => "Failed to send message".to_string(),
            Self::NotificationPersistence { .. } => "Failed to deliver message".to_string(),
        }
    }

    /// 失敗時点で既に保存されていたメッセージの ID
    pub fn persisted_message_id(&self) -> Option<&MessageId> {
        match self {
            Self::NotificationPersistence { message_id, .. } => Some(message_id),
            _ => None,
        }
    }
}

/// 既存のメッセージ・通知・チャットに対する操作のエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    /// 対象が存在しない、または操作者に権限がない（存在を漏らさないため区別しない）
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid input: {0}")]
    Invalid(#[from] ValueObjectError),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<RepositoryError> for ActionError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(what) => Self::NotFound(what),
            RepositoryError::Conflict(what) => Self::Conflict(what),
            RepositoryError::Storage(what) => Self::Persistence(what),
        }
    }
}
