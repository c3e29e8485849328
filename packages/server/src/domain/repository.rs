//! Repository trait 定義
//!
//! 永続化コラボレーター（ドキュメントストア）へのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## 並行性
//!
//! 永続化への呼び出しはすべて中断点になり得ます。呼び出し側はメモリ上のロックを
//! 保持したまま、これらのメソッドを await してはいけません。
//! 同じドキュメントへの競合する書き込みの調停は実装側の責務です。

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    ActiveSender, Message, NewMessage, Notification, NotificationUpsert, Reaction, RepositoryError,
    UserPresence,
    value_object::{
        ChatId, Emoji, MessageId, NotificationId, ThemeName, Timestamp, UserId, UserStatus,
    },
};

/// ユーザープロフィール・プレゼンスの永続化
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 表示名を取得（プロフィールが存在しなければ `None`）
    async fn display_name(&self, user_id: &UserId) -> Result<Option<String>, RepositoryError>;

    /// ステータスを更新し、`last_seen` を `at` で記録
    async fn set_status(
        &self,
        user_id: &UserId,
        status: UserStatus,
        at: Timestamp,
    ) -> Result<(), RepositoryError>;

    /// 永続化されたプレゼンスを取得
    async fn presence(&self, user_id: &UserId) -> Result<UserPresence, RepositoryError>;
}

/// チャットの永続化
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// チャットの参加者（権威ある一覧）を取得
    ///
    /// チャットが存在しない場合は `RepositoryError::NotFound`。
    async fn participants(&self, chat_id: &ChatId) -> Result<Vec<UserId>, RepositoryError>;

    /// 参加者全員分のテーマを保存
    async fn save_theme(
        &self,
        chat_id: &ChatId,
        user_id: &UserId,
        theme: &ThemeName,
    ) -> Result<(), RepositoryError>;
}

/// メッセージの永続化
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// メッセージを作成し、安定 ID 付きのレコードを返す
    async fn create_message(&self, message: NewMessage) -> Result<Message, RepositoryError>;

    async fn get_message(&self, message_id: &MessageId) -> Result<Message, RepositoryError>;

    /// 既読者を追加（集合への冪等な追加）。新規に追加された場合のみ `true`
    async fn add_read_by(
        &self,
        message_id: &MessageId,
        reader_id: &UserId,
    ) -> Result<bool, RepositoryError>;

    /// 本文を編集（送信者のみ、削除済みは不可）
    async fn update_content(
        &self,
        message_id: &MessageId,
        editor_id: &UserId,
        content: String,
        at: Timestamp,
    ) -> Result<Message, RepositoryError>;

    /// 送信者によるソフト削除
    async fn delete_message(
        &self,
        message_id: &MessageId,
        sender_id: &UserId,
        at: Timestamp,
    ) -> Result<Message, RepositoryError>;

    /// 全員に対する削除（送信者のみ）
    async fn delete_for_everyone(
        &self,
        message_id: &MessageId,
        user_id: &UserId,
        at: Timestamp,
    ) -> Result<Message, RepositoryError>;

    /// 特定ユーザーに対してだけ非表示にする
    async fn delete_for_user(
        &self,
        message_id: &MessageId,
        user_id: &UserId,
    ) -> Result<Message, RepositoryError>;

    /// リアクションを追加（同じユーザーの既存リアクションは置き換え）。現在の一覧を返す
    async fn add_reaction(
        &self,
        message_id: &MessageId,
        user_id: &UserId,
        emoji: Emoji,
        at: Timestamp,
    ) -> Result<Vec<Reaction>, RepositoryError>;

    /// リアクションを削除。現在の一覧を返す
    async fn remove_reaction(
        &self,
        message_id: &MessageId,
        user_id: &UserId,
    ) -> Result<Vec<Reaction>, RepositoryError>;
}

/// 集約通知の永続化
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// (recipient, sender, 未読) の行をアトミックに find-and-update-or-insert
    ///
    /// 既存の未読行があれば `message_count` を 1 増やして要約・最新本文・時刻を置き換え、
    /// なければ `message_count = 1` で新規作成する。同一ペアへの同時呼び出しが
    /// 2 行の未読を生むことはない。
    async fn upsert_unread(
        &self,
        upsert: NotificationUpsert,
    ) -> Result<Notification, RepositoryError>;

    /// 1 件を既読にする。受信者の通知でなければ `NotFound`
    ///
    /// 2 つ目の値は今回の呼び出しで未読から既読に変わったかどうか。
    async fn mark_read(
        &self,
        recipient_id: &UserId,
        notification_id: &NotificationId,
        at: Timestamp,
    ) -> Result<(Notification, bool), RepositoryError>;

    /// 特定の送信者からの未読をすべて既読にし、件数を返す
    async fn mark_all_from_sender_read(
        &self,
        recipient_id: &UserId,
        sender_id: &UserId,
        at: Timestamp,
    ) -> Result<u64, RepositoryError>;

    /// 全未読を既読にし、件数を返す
    async fn mark_all_read(
        &self,
        recipient_id: &UserId,
        at: Timestamp,
    ) -> Result<u64, RepositoryError>;

    /// 未読の行数
    async fn unread_count(&self, recipient_id: &UserId) -> Result<u64, RepositoryError>;

    /// 特定の送信者からの未読行（高々 1 件）
    async fn unread_from_sender(
        &self,
        recipient_id: &UserId,
        sender_id: &UserId,
    ) -> Result<Option<Notification>, RepositoryError>;

    /// 未読通知の送信者を最新メッセージの新しい順に返す
    async fn active_senders(
        &self,
        recipient_id: &UserId,
    ) -> Result<Vec<ActiveSender>, RepositoryError>;

    /// 新しい順に最大 `limit` 件
    async fn list(
        &self,
        recipient_id: &UserId,
        limit: usize,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError>;

    async fn delete(
        &self,
        recipient_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), RepositoryError>;

    /// 受信者の既読通知をすべて削除
    async fn delete_read(&self, recipient_id: &UserId) -> Result<u64, RepositoryError>;

    /// `cutoff` より前に更新された既読通知を全ユーザー分削除
    async fn delete_read_before(&self, cutoff: Timestamp) -> Result<u64, RepositoryError>;
}

/// 永続化コラボレーター一式
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub chats: Arc<dyn ChatRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    /// 4 つのトレイトすべてを実装する単一のストアから構築
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + ChatRepository
            + MessageRepository
            + NotificationRepository
            + 'static,
    {
        Self {
            users: store.clone(),
            chats: store.clone(),
            messages: store.clone(),
            notifications: store,
        }
    }
}
