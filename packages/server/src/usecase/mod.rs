//! UseCase 層
//!
//! 接続ライフサイクル、ルーム参加、メッセージのファンアウト、通知集約、
//! タイピング・既読のリレーなど、リアルタイム配信のビジネスロジックを実装します。
//!
//! すべてのユースケースは永続化コラボレーター（`Repositories`）と
//! `EventEmitter` を注入されて動作し、トランスポートには依存しません。

pub mod connect_client;
pub mod disconnect_client;
pub mod emitter;
pub mod error;
pub mod message_lifecycle;
pub mod notification;
pub mod presence_query;
pub mod reaction;
pub mod read_receipt;
pub mod room_membership;
pub mod send_message;
pub mod theme;
pub mod typing;

#[cfg(test)]
pub(crate) mod test_support;

pub use connect_client::ConnectClientUseCase;
pub use disconnect_client::DisconnectClientUseCase;
pub use emitter::EventEmitter;
pub use error::{ActionError, PresenceError, SendMessageError};
pub use message_lifecycle::MessageLifecycleUseCase;
pub use notification::{NotificationBadge, NotificationUseCase};
pub use presence_query::PresenceQueryUseCase;
pub use reaction::ReactionUseCase;
pub use read_receipt::ReadReceiptUseCase;
pub use room_membership::RoomMembershipUseCase;
pub use send_message::{FanOut, SendMessageRequest, SendMessageUseCase};
pub use theme::ThemeUseCase;
pub use typing::TypingUseCase;

use crate::domain::{ChatId, ChatRepository, UserId};

/// ユースケースの動作設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSettings {
    /// 通知要約に含める本文プレビューの最大文字数
    pub preview_chars: usize,
    /// `request_notifications` で返す件数
    pub notification_page_size: usize,
    /// 既読通知の保持日数
    pub retention_days: u32,
    /// 保持期間切れ通知の掃除間隔（秒）
    pub cleanup_interval_secs: u64,
    /// ルーム参加時にチャット参加者かどうかを確認する
    pub verify_join: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            preview_chars: 50,
            notification_page_size: 10,
            retention_days: 30,
            cleanup_interval_secs: 3600,
            verify_join: false,
        }
    }
}

/// ユーザーがチャット参加者であることを確認
///
/// 参加者でない場合もチャットが存在しない場合も `NotFound` を返し、
/// チャットの存在を漏らさない。
pub(crate) async fn ensure_participant(
    chats: &dyn ChatRepository,
    chat_id: &ChatId,
    user_id: &UserId,
) -> Result<Vec<UserId>, ActionError> {
    let participants = chats.participants(chat_id).await?;
    if !participants.contains(user_id) {
        return Err(ActionError::NotFound(format!("chat '{}'", chat_id)));
    }
    Ok(participants)
}
