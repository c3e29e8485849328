//! エンティティ定義
//!
//! 永続化コラボレーターが所有するレコードのうち、
//! リアルタイム配信と通知集約が参照するフィールドだけを表現します。

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::value_object::{
    ChatId, Emoji, MessageContent, MessageId, MessageKind, NotificationId, Timestamp, UserId,
    UserStatus,
};

/// ファイル添付メッセージのメタデータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_name: String,
    pub file_url: String,
    pub file_size: u64,
    pub mime_type: String,
}

/// 永続化前のメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: MessageContent,
    pub kind: MessageKind,
    pub file: Option<FileMetadata>,
    pub created_at: Timestamp,
}

/// 永続化済みメッセージ
///
/// `id` は以降の既読・リアクション・編集・削除の相関に使われる安定 ID。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: String,
    pub kind: MessageKind,
    pub file: Option<FileMetadata>,
    pub created_at: Timestamp,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub edit_count: u32,
    pub read_by: BTreeSet<UserId>,
}

/// メッセージへのリアクション（1 ユーザー 1 メッセージにつき 1 件）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reaction {
    pub user_id: UserId,
    pub emoji: Emoji,
    pub reacted_at: Timestamp,
}

/// 集約通知
///
/// (recipient, sender, 未読) につき高々 1 件。既読になった行は以降の集約対象外。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub chat_id: ChatId,
    /// "{sender_name}: {preview}" 形式の要約行
    pub summary: String,
    pub message_count: u32,
    pub latest_content: String,
    pub latest_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
}

/// 未読通知を持つ送信者ごとの集計
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSender {
    pub sender_id: UserId,
    pub sender_name: String,
    pub chat_id: ChatId,
    pub message_count: u32,
    pub latest_content: String,
    pub latest_at: Timestamp,
}

/// 集約通知の upsert 入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationUpsert {
    pub recipient_id: UserId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub chat_id: ChatId,
    pub summary: String,
    pub content: String,
    pub at: Timestamp,
}

/// 永続化されたユーザーのプレゼンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPresence {
    pub user_id: UserId,
    pub display_name: String,
    pub status: UserStatus,
    pub last_seen: Option<Timestamp>,
}

/// チャット参加者のステータス（初期ステータス配信用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantStatus {
    pub user_id: UserId,
    pub status: UserStatus,
    pub username: String,
    pub last_seen: Option<Timestamp>,
}

impl From<UserPresence> for ParticipantStatus {
    fn from(presence: UserPresence) -> Self {
        Self {
            user_id: presence.user_id,
            status: presence.status,
            username: presence.display_name,
            last_seen: presence.last_seen,
        }
    }
}
