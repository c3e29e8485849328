//! UseCase: リアクション
//!
//! 操作者は常にセッションのユーザーで、クライアントが送ってきた ID は使いません。
//! 永続化の後、メッセージのチャットルームへ（送信元の接続を除き）
//! `reaction_updated` を配信します。

use std::sync::Arc;

use hangspace_shared::time::Clock;

use crate::domain::{
    ChatRepository, ConnectionId, Emoji, MessageId, MessageRepository, Reaction, ServerEvent,
    Timestamp, UserId,
    event::{ReactionAction, ReactionPayload},
};

use super::{EventEmitter, ensure_participant, error::ActionError};

pub struct ReactionUseCase {
    chats: Arc<dyn ChatRepository>,
    messages: Arc<dyn MessageRepository>,
    emitter: EventEmitter,
    clock: Arc<dyn Clock>,
}

impl ReactionUseCase {
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

    /// リアクションを追加（同じユーザーの既存リアクションは置き換え）
    pub async fn add(
        &self,
        origin: &ConnectionId,
        user_id: &UserId,
        message_id: &MessageId,
        emoji: String,
    ) -> Result<Vec<Reaction>, ActionError> {
        let emoji = Emoji::new(emoji)?;
        let message = self.messages.get_message(message_id).await?;
        ensure_participant(self.chats.as_ref(), &message.chat_id, user_id).await?;

        let now = Timestamp::new(self.clock.now_millis());
        let reactions = self
            .messages
            .add_reaction(message_id, user_id, emoji.clone(), now)
            .await?;

        self.emitter
            .to_room_except(
                &message.chat_id,
                Some(origin),
                &ServerEvent::ReactionUpdated {
                    message_id: message.id.clone(),
                    chat_id: message.chat_id.clone(),
                    user_id: user_id.clone(),
                    emoji: Some(emoji.as_str().to_string()),
                    action: ReactionAction::Added,
                    reactions: reactions.iter().map(ReactionPayload::from).collect(),
                },
            )
            .await;
        Ok(reactions)
    }

    /// リアクションを削除
    pub async fn remove(
        &self,
        origin: &ConnectionId,
        user_id: &UserId,
        message_id: &MessageId,
    ) -> Result<Vec<Reaction>, ActionError> {
        let message = self.messages.get_message(message_id).await?;
        ensure_participant(self.chats.as_ref(), &message.chat_id, user_id).await?;

        let reactions = self.messages.remove_reaction(message_id, user_id).await?;

        self.emitter
            .to_room_except(
                &message.chat_id,
                Some(origin),
                &ServerEvent::ReactionUpdated {
                    message_id: message.id.clone(),
                    chat_id: message.chat_id.clone(),
                    user_id: user_id.clone(),
                    emoji: None,
                    action: ReactionAction::Removed,
                    reactions: reactions.iter().map(ReactionPayload::from).collect(),
                },
            )
            .await;
        Ok(reactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{TestHarness, conn, user};

    fn usecase(harness: &TestHarness) -> ReactionUseCase {
        ReactionUseCase::new(
            harness.repos.chats.clone(),
            harness.repos.messages.clone(),
            harness.emitter.clone(),
            harness.clock.clone(),
        )
    }

    #[tokio::test]
    async fn test_reaction_added_is_broadcast_to_room_except_origin() {
        // テスト項目: リアクション追加が送信元以外のルーム参加接続に届く
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let reactions = usecase(&harness);
        let message = harness.seed_message("C123", "A", "hello").await;
        let mut a = harness.connect("a1", Some("A")).await;
        let mut b = harness.connect("b1", Some("B")).await;
        harness.join("a1", "C123");
        harness.join("b1", "C123");

        // when (操作):
        let current = reactions
            .add(&conn("b1"), &user("B"), &message.id, "👍".to_string())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(current.len(), 1);
        let events = a.named("reaction_updated");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["action"], "added");
        assert_eq!(events[0]["user_id"], "B");
        assert_eq!(events[0]["reactions"][0]["emoji"], "👍");
        assert!(b.events().is_empty());
    }

    #[tokio::test]
    async fn test_reaction_removed_carries_remaining_reactions() {
        // テスト項目: リアクション削除後の一覧が配信される
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let reactions = usecase(&harness);
        let message = harness.seed_message("C123", "A", "hello").await;
        let mut a = harness.connect("a1", Some("A")).await;
        harness.join("a1", "C123");
        reactions
            .add(&conn("b1"), &user("B"), &message.id, "🎉".to_string())
            .await
            .unwrap();
        a.events();

        // when (操作):
        let current = reactions
            .remove(&conn("b1"), &user("B"), &message.id)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(current.is_empty());
        let events = a.named("reaction_updated");
        assert_eq!(events[0]["action"], "removed");
        assert!(events[0].get("emoji").is_none());
    }

    #[tokio::test]
    async fn test_reaction_by_non_participant_is_not_found() {
        // テスト項目: 参加者でないユーザーのリアクションは NotFound
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let reactions = usecase(&harness);
        let message = harness.seed_message("C123", "A", "hello").await;

        // when (操作):
        let result = reactions
            .add(&conn("x1"), &user("X"), &message.id, "👍".to_string())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ActionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_blank_emoji_is_invalid() {
        // テスト項目: 空の絵文字は入力エラー
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let reactions = usecase(&harness);
        let message = harness.seed_message("C123", "A", "hello").await;

        // when (操作):
        let result = reactions
            .add(&conn("b1"), &user("B"), &message.id, " ".to_string())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ActionError::Invalid(_))));
    }
}
