//! UseCase: 既読のリレー
//!
//! 既読者をメッセージの既読集合に冪等に追加し、新規に追加された場合だけ
//! 送信者のアイデンティティチャンネルへ `message_read_receipt` を配信します。
//! 既読者が送信者自身の場合は何もしません。

use std::sync::Arc;

use hangspace_shared::time::Clock;

use crate::domain::{
    ChatRepository, MessageId, MessageRepository, ServerEvent, Timestamp, UserId,
};

use super::{EventEmitter, ensure_participant, error::ActionError};

pub struct ReadReceiptUseCase {
    chats: Arc<dyn ChatRepository>,
    messages: Arc<dyn MessageRepository>,
    emitter: EventEmitter,
    clock: Arc<dyn Clock>,
}

impl ReadReceiptUseCase {
    pub fn new(
        chats: Arc<dyn ChatRepository>,
        messages: Arc<dyn MessageRepository>,
        emitter: EventEmitter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            chats,
            messages,
            emitter,
            clock,
        }
    }

    /// 既読を記録する。既読通知を配信した場合のみ `true`
    pub async fn execute(
        &self,
        message_id: &MessageId,
        reader_id: &UserId,
    ) -> Result<bool, ActionError> {
        let message = self.messages.get_message(message_id).await?;
        ensure_participant(self.chats.as_ref(), &message.chat_id, reader_id).await?;

        if &message.sender_id == reader_id {
            return Ok(false);
        }

        let newly_added = self.messages.add_read_by(message_id, reader_id).await?;
        if !newly_added {
            tracing::debug!(message_id = %message_id, reader_id = %reader_id, "Already read");
            return Ok(false);
        }

        let read_at = Timestamp::new(self.clock.now_millis());
        self.emitter
            .to_user(
                &message.sender_id,
                &ServerEvent::MessageReadReceipt {
                    message_id: message.id.clone(),
                    reader_id: reader_id.clone(),
                    chat_id: message.chat_id.clone(),
                    read_at: read_at.to_rfc3339(),
                },
            )
            .await;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{TestHarness, message_id, user};

    fn usecase(harness: &TestHarness) -> ReadReceiptUseCase {
        ReadReceiptUseCase::new(
            harness.repos.chats.clone(),
            harness.repos.messages.clone(),
            harness.emitter.clone(),
            harness.clock.clone(),
        )
    }

    #[tokio::test]
    async fn test_read_receipt_is_emitted_once() {
        // テスト項目: 同じ既読者が 2 回既読にしても、既読通知は 1 回だけ
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let receipts = usecase(&harness);
        let id = harness.seed_message("C123", "A", "hello").await.id;
        let mut a = harness.connect("a1", Some("A")).await;

        // when (操作):
        let first = receipts.execute(&id, &user("B")).await.unwrap();
        let second = receipts.execute(&id, &user("B")).await.unwrap();

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        let events = a.named("message_read_receipt");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["reader_id"], "B");
        assert_eq!(events[0]["chat_id"], "C123");
    }

    #[tokio::test]
    async fn test_sender_reading_own_message_is_noop() {
        // テスト項目: 送信者自身の既読は何も起こさない
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let receipts = usecase(&harness);
        let id = harness.seed_message("C123", "A", "hello").await.id;
        let mut a = harness.connect("a1", Some("A")).await;

        // when (操作):
        let emitted = receipts.execute(&id, &user("A")).await.unwrap();

        // then (期待する結果):
        assert!(!emitted);
        assert!(a.events().is_empty());
        let message = harness.repos.messages.get_message(&id).await.unwrap();
        assert!(message.read_by.is_empty());
    }

    #[tokio::test]
    async fn test_non_participant_and_unknown_message_are_not_found() {
        // テスト項目: 参加者でない既読者・存在しないメッセージは NotFound
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let receipts = usecase(&harness);
        let id = harness.seed_message("C123", "A", "hello").await.id;

        // when (操作):
        let outsider = receipts.execute(&id, &user("X")).await;
        let missing = receipts.execute(&message_id("nope"), &user("B")).await;

        // then (期待する結果):
        assert!(matches!(outsider, Err(ActionError::NotFound(_))));
        assert!(matches!(missing, Err(ActionError::NotFound(_))));
    }
}
