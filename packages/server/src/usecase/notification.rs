//! UseCase: 通知集約（Notification Consolidator）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 同じ送信者からの連続メッセージが 1 行に集約され、件数と要約が更新されること
//! - 既読化（1 件・送信者単位・全件）で `notifications_cleared` とバッジが配信されること
//! - 一覧・未読のある送信者一覧・削除・保持期間切れの掃除
//!
//! ### バッジの定義
//! - 全体バッジ = 未読の通知行数（未読のある送信者の数）
//! - 送信者ごとのバッジ = その行の `message_count`

use std::sync::Arc;

use hangspace_shared::time::{Clock, MILLIS_PER_DAY};

use crate::domain::{
    ActiveSender, ChatId, ConnectionId, Notification, NotificationId, NotificationRepository,
    NotificationUpsert, RepositoryError, ServerEvent, Timestamp, UserId,
    event::NotificationPayload, notification::build_summary,
};

use super::{ChatSettings, EventEmitter, error::ActionError};

/// 未読バッジ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationBadge {
    /// 未読の通知行数
    pub unread_count: u64,
    /// 指定した送信者の未読行の `message_count`（送信者指定時のみ）
    pub sender_message_count: Option<u32>,
}

/// 通知集約のユースケース
pub struct NotificationUseCase {
    notifications: Arc<dyn NotificationRepository>,
    emitter: EventEmitter,
    clock: Arc<dyn Clock>,
    preview_chars: usize,
    page_size: usize,
    retention_days: u32,
}

impl NotificationUseCase {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        emitter: EventEmitter,
        clock: Arc<dyn Clock>,
        settings: &ChatSettings,
    ) -> Self {
        Self {
            notifications,
            emitter,
            clock,
            preview_chars: settings.preview_chars,
            page_size: settings.notification_page_size,
            retention_days: settings.retention_days,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// 新着メッセージを受信者の未読通知に集約する（配信はしない）
    ///
    /// 検索と更新は Repository のアトミックな upsert に委ねる。
    pub async fn upsert_message_notification(
        &self,
        recipient_id: &UserId,
        sender_id: &UserId,
        sender_name: &str,
        chat_id: &ChatId,
        content: &str,
        at: Timestamp,
    ) -> Result<Notification, RepositoryError> {
        self.notifications
            .upsert_unread(NotificationUpsert {
                recipient_id: recipient_id.clone(),
                sender_id: sender_id.clone(),
                sender_name: sender_name.to_string(),
                chat_id: chat_id.clone(),
                summary: build_summary(sender_name, content, self.preview_chars),
                content: content.to_string(),
                at,
            })
            .await
    }

    /// 全体バッジ（未読行数）
    pub async fn unread_count(&self, recipient_id: &UserId) -> Result<u64, RepositoryError> {
        self.notifications.unread_count(recipient_id).await
    }

    /// 全体バッジと、指定があれば送信者ごとのバッジ
    pub async fn badge(
        &self,
        recipient_id: &UserId,
        sender_id: Option<&UserId>,
    ) -> Result<NotificationBadge, ActionError> {
        let unread_count = self.notifications.unread_count(recipient_id).await?;
        let sender_message_count = match sender_id {
            Some(sender_id) => Some(
                self.notifications
                    .unread_from_sender(recipient_id, sender_id)
                    .await?
                    .map_or(0, |n| n.message_count),
            ),
            None => None,
        };
        Ok(NotificationBadge {
            unread_count,
            sender_message_count,
        })
    }

    /// 新しい順に最大 `limit` 件（未指定ならページサイズ）
    pub async fn list(
        &self,
        recipient_id: &UserId,
        limit: Option<usize>,
        unread_only: bool,
    ) -> Result<Vec<Notification>, ActionError> {
        let limit = limit.unwrap_or(self.page_size);
        Ok(self
            .notifications
            .list(recipient_id, limit, unread_only)
            .await?)
    }

    /// 未読通知のある送信者一覧（最新メッセージの新しい順）
    pub async fn active_senders(
        &self,
        recipient_id: &UserId,
    ) -> Result<Vec<ActiveSender>, ActionError> {
        Ok(self.notifications.active_senders(recipient_id).await?)
    }

    /// `request_notifications`: 一覧とバッジを要求した接続にだけ返す
    pub async fn request_notifications(
        &self,
        connection_id: &ConnectionId,
        recipient_id: &UserId,
    ) -> Result<(), ActionError> {
        let notifications = self.list(recipient_id, None, false).await?;
        let unread_count = self.notifications.unread_count(recipient_id).await?;
        self.emitter
            .to_connection(
                connection_id,
                &ServerEvent::NotificationsData {
                    notifications: notifications.iter().map(NotificationPayload::from).collect(),
                    unread_count,
                },
            )
            .await;
        Ok(())
    }

    /// 1 件を既読にする
    ///
    /// 既に既読だった場合は何も配信しない。
    pub async fn mark_read(
        &self,
        recipient_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<Notification, ActionError> {
        let now = self.now();
        let (notification, flipped) = self
            .notifications
            .mark_read(recipient_id, notification_id, now)
            .await?;
        if flipped {
            self.emit_cleared(recipient_id, Some(notification.sender_id.clone()), 1, now)
                .await?;
        }
        Ok(notification)
    }

    /// 特定の送信者からの未読をすべて既読にする
    pub async fn mark_all_from_sender_read(
        &self,
        recipient_id: &UserId,
        sender_id: &UserId,
    ) -> Result<u64, ActionError> {
        let now = self.now();
        let cleared = self
            .notifications
            .mark_all_from_sender_read(recipient_id, sender_id, now)
            .await?;
        self.emit_cleared(recipient_id, Some(sender_id.clone()), cleared, now)
            .await?;
        Ok(cleared)
    }

    /// 全未読を既読にする
    pub async fn mark_all_read(&self, recipient_id: &UserId) -> Result<u64, ActionError> {
        let now = self.now();
        let cleared = self.notifications.mark_all_read(recipient_id, now).await?;
        self.emit_cleared(recipient_id, None, cleared, now).await?;
        Ok(cleared)
    }

    /// 1 件を削除
    pub async fn delete(
        &self,
        recipient_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), ActionError> {
        self.notifications
            .delete(recipient_id, notification_id)
            .await?;
        self.emit_badge(recipient_id).await?;
        Ok(())
    }

    /// 既読の通知をすべて削除
    pub async fn delete_read(&self, recipient_id: &UserId) -> Result<u64, ActionError> {
        Ok(self.notifications.delete_read(recipient_id).await?)
    }

    /// 保持期間を過ぎた既読通知を全ユーザー分削除
    pub async fn cleanup_expired(&self) -> Result<u64, RepositoryError> {
        let retention = i64::from(self.retention_days) * MILLIS_PER_DAY;
        let cutoff = Timestamp::new(self.clock.now_millis().saturating_sub(retention));
        let deleted = self.notifications.delete_read_before(cutoff).await?;
        if deleted > 0 {
            tracing::info!(deleted, cutoff = %cutoff.to_rfc3339(), "Expired notifications removed");
        }
        Ok(deleted)
    }

    async fn emit_cleared(
        &self,
        recipient_id: &UserId,
        sender_id: Option<UserId>,
        cleared: u64,
        at: Timestamp,
    ) -> Result<(), ActionError> {
        self.emitter
            .to_user(
                recipient_id,
                &ServerEvent::notifications_cleared(sender_id, cleared, at),
            )
            .await;
        self.emit_badge(recipient_id).await
    }

    async fn emit_badge(&self, recipient_id: &UserId) -> Result<(), ActionError> {
        let unread_count = self.notifications.unread_count(recipient_id).await?;
        self.emitter
            .to_user(
                recipient_id,
                &ServerEvent::NotificationBadgeUpdated { unread_count },
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{NOW, TestHarness, chat, conn, notification_id, user};
    use hangspace_shared::time::FixedClock;

    fn usecase(harness: &TestHarness) -> NotificationUseCase {
        NotificationUseCase::new(
            harness.repos.notifications.clone(),
            harness.emitter.clone(),
            harness.clock.clone(),
            &harness.settings,
        )
    }

    async fn notify(usecase: &NotificationUseCase, content: &str) -> Notification {
        usecase
            .upsert_message_notification(
                &user("B"),
                &user("A"),
                "A",
                &chat("C123"),
                content,
                Timestamp::new(NOW),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_consecutive_messages_update_count_and_summary() {
        // テスト項目: "hi" → "there" で message_count が 1 → 2、要約が "A: there" になる
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let notifications = usecase(&harness);

        // when (操作):
        let first = notify(&notifications, "hi").await;
        let second = notify(&notifications, "there").await;

        // then (期待する結果):
        assert_eq!(first.message_count, 1);
        assert_eq!(second.message_count, 2);
        assert_eq!(second.summary, "A: there");
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn test_k_messages_produce_one_row_with_count_k() {
        // テスト項目: K 件の連続メッセージは message_count == K の 1 行になる
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let notifications = usecase(&harness);

        // when (操作):
        for i in 0..7 {
            notify(&notifications, &format!("message {}", i)).await;
        }

        // then (期待する結果):
        let badge = notifications
            .badge(&user("B"), Some(&user("A")))
            .await
            .unwrap();
        assert_eq!(badge.unread_count, 1);
        assert_eq!(badge.sender_message_count, Some(7));
        assert_eq!(harness.store.notification_rows(&user("B")).await, 1);
    }

    #[tokio::test]
    async fn test_summary_preview_is_truncated() {
        // テスト項目: 長い本文は要約で省略される
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let notifications = usecase(&harness);
        let long = "x".repeat(80);

        // when (操作):
        let notification = notify(&notifications, &long).await;

        // then (期待する結果):
        assert_eq!(notification.summary, format!("A: {}...", "x".repeat(47)));
        assert_eq!(notification.latest_content, long);
    }

    #[tokio::test]
    async fn test_mark_read_then_new_message_starts_fresh_cycle() {
        // テスト項目: 既読後の次のメッセージは message_count == 1 の新しい行になる
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let notifications = usecase(&harness);
        let first = notify(&notifications, "hi").await;
        notify(&notifications, "again").await;

        // when (操作):
        notifications.mark_read(&user("B"), &first.id).await.unwrap();
        let fresh = notify(&notifications, "later").await;

        // then (期待する結果):
        assert_ne!(fresh.id, first.id);
        assert_eq!(fresh.message_count, 1);
    }

    #[tokio::test]
    async fn test_mark_read_emits_cleared_and_badge_to_recipient() {
        // テスト項目: 既読化で受信者の全接続に notifications_cleared とバッジが届く
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let notifications = usecase(&harness);
        let mut b1 = harness.connect("b1", Some("B")).await;
        let mut b2 = harness.connect("b2", Some("B")).await;
        let mut a = harness.connect("a1", Some("A")).await;
        let notification = notify(&notifications, "hi").await;

        // when (操作):
        notifications
            .mark_read(&user("B"), &notification.id)
            .await
            .unwrap();

        // then (期待する結果):
        for client in [&mut b1, &mut b2] {
            let events = client.events();
            assert_eq!(events.len(), 2);
            assert_eq!(events[0]["event"], "notifications_cleared");
            assert_eq!(events[0]["data"]["sender_id"], "A");
            assert_eq!(events[1]["event"], "notification_badge_updated");
            assert_eq!(events[1]["data"]["unread_count"], 0);
        }
        assert!(a.events().is_empty());
    }

    #[tokio::test]
    async fn test_active_senders_lists_unread_senders_newest_first() {
        // テスト項目: 未読のある送信者だけが最新メッセージの新しい順に並ぶ
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let notifications = usecase(&harness);
        notify(&notifications, "hi").await;
        notify(&notifications, "there").await;
        notifications
            .upsert_message_notification(
                &user("B"),
                &user("C"),
                "C",
                &chat("G1"),
                "yo",
                Timestamp::new(NOW + 5),
            )
            .await
            .unwrap();
        let read = notifications
            .upsert_message_notification(
                &user("B"),
                &user("X"),
                "X",
                &chat("G1"),
                "old news",
                Timestamp::new(NOW + 10),
            )
            .await
            .unwrap();
        notifications.mark_read(&user("B"), &read.id).await.unwrap();

        // when (操作):
        let senders = notifications.active_senders(&user("B")).await.unwrap();

        // then (期待する結果):
        assert_eq!(senders.len(), 2);
        assert_eq!(senders[0].sender_id, user("C"));
        assert_eq!(senders[0].message_count, 1);
        assert_eq!(senders[0].latest_content, "yo");
        assert_eq!(senders[1].sender_id, user("A"));
        assert_eq!(senders[1].sender_name, "A");
        assert_eq!(senders[1].message_count, 2);
        assert_eq!(senders[1].latest_content, "there");
    }

    #[tokio::test]
    async fn test_mark_read_twice_emits_only_once() {
        // テスト項目: 既読済みの通知を再度既読にしても notifications_cleared は届かない
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let notifications = usecase(&harness);
        let mut b = harness.connect("b1", Some("B")).await;
        let notification = notify(&notifications, "hi").await;
        notifications
            .mark_read(&user("B"), &notification.id)
            .await
            .unwrap();
        b.events();

        // when (操作):
        let again = notifications
            .mark_read(&user("B"), &notification.id)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(again.is_read);
        assert!(b.events().is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_of_foreign_notification_is_not_found() {
        // テスト項目: 他人の通知の既読化は NotFound
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let notifications = usecase(&harness);
        let notification = notify(&notifications, "hi").await;

        // when (操作):
        let result = notifications.mark_read(&user("C"), &notification.id).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ActionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mark_all_read_reports_cleared_count() {
        // テスト項目: 全件既読化で件数が返り、sender_id なしの cleared が届く
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let notifications = usecase(&harness);
        let mut b = harness.connect("b1", Some("B")).await;
        notify(&notifications, "hi").await;
        notifications
            .upsert_message_notification(
                &user("B"),
                &user("C"),
                "C",
                &chat("G1"),
                "yo",
                Timestamp::new(NOW),
            )
            .await
            .unwrap();

        // when (操作):
        let cleared = notifications.mark_all_read(&user("B")).await.unwrap();

        // then (期待する結果):
        assert_eq!(cleared, 2);
        let events = b.named("notifications_cleared");
        assert_eq!(events[0]["cleared_count"], 2);
        assert!(events[0]["sender_id"].is_null());
        assert_eq!(notifications.unread_count(&user("B")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_all_from_sender_read_keeps_other_senders() {
        // テスト項目: 送信者指定の既読化は他の送信者の未読を残す
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let notifications = usecase(&harness);
        notify(&notifications, "hi").await;
        notifications
            .upsert_message_notification(
                &user("B"),
                &user("C"),
                "C",
                &chat("G1"),
                "yo",
                Timestamp::new(NOW),
            )
            .await
            .unwrap();

        // when (操作):
        let cleared = notifications
            .mark_all_from_sender_read(&user("B"), &user("A"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(cleared, 1);
        assert_eq!(notifications.unread_count(&user("B")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_request_notifications_answers_requesting_connection_only() {
        // テスト項目: request_notifications は要求した接続にだけ一覧とバッジを返す
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let notifications = usecase(&harness);
        let mut b1 = harness.connect("b1", Some("B")).await;
        let mut b2 = harness.connect("b2", Some("B")).await;
        notify(&notifications, "hi").await;

        // when (操作):
        notifications
            .request_notifications(&conn("b1"), &user("B"))
            .await
            .unwrap();

        // then (期待する結果):
        let data = b1.named("notifications_data");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["unread_count"], 1);
        assert_eq!(data[0]["notifications"][0]["message"], "A: hi");
        assert!(b2.events().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_notification_is_not_found() {
        // テスト項目: 存在しない通知の削除は NotFound
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let notifications = usecase(&harness);

        // when (操作):
        let result = notifications
            .delete(&user("B"), &notification_id("missing"))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ActionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cleanup_expired_removes_old_read_notifications() {
        // テスト項目: 保持期間を過ぎた既読通知だけが削除される
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let notifications = usecase(&harness);
        let old = notify(&notifications, "old").await;
        notifications.mark_read(&user("B"), &old.id).await.unwrap();
        notifications
            .upsert_message_notification(
                &user("B"),
                &user("C"),
                "C",
                &chat("G1"),
                "unread",
                Timestamp::new(NOW),
            )
            .await
            .unwrap();
        let later = NotificationUseCase::new(
            harness.repos.notifications.clone(),
            harness.emitter.clone(),
            Arc::new(FixedClock::new(NOW + 31 * MILLIS_PER_DAY)),
            &harness.settings,
        );

        // when (操作):
        let deleted = later.cleanup_expired().await.unwrap();

        // then (期待する結果):
        assert_eq!(deleted, 1);
        assert_eq!(harness.store.notification_rows(&user("B")).await, 1);
    }
}
