//! UseCase: タイピング通知のリレー
//!
//! 永続化は行わず、ルームの参加接続（送信元を除く）へそのまま中継します。
//! 送信元の接続がそのルームに参加していなければ中継しません。

use std::sync::Arc;

use crate::domain::{
    ChatId, ConnectionId, ServerEvent, UserId, UserRepository, notification::UNKNOWN_SENDER,
};

pub struct TypingUseCase {
    users: Arc<dyn UserRepository>,
    emitter: super::EventEmitter,
}

impl TypingUseCase {
    pub fn new(users: Arc<dyn UserRepository>, emitter: super::EventEmitter) -> Self {
        Self { users, emitter }
    }

    /// タイピング状態を中継し、届いた接続数を返す
    pub async fn execute(
        &self,
        origin: &ConnectionId,
        user_id: &UserId,
        chat_id: &ChatId,
        is_typing: bool,
    ) -> usize {
        // レジストリだけで判定し、永続化層には問い合わせない
        if !self.emitter.registry().rooms_of(origin).contains(chat_id) {
            tracing::debug!(
                connection_id = %origin,
                user_id = %user_id,
                chat_id = %chat_id,
                "Typing dropped: connection has not joined the room"
            );
            return 0;
        }
        let username = match self.users.display_name(user_id).await {
            Ok(Some(name)) => name,
            Ok(None) => UNKNOWN_SENDER.to_string(),
            Err(e) => {
                tracing::warn!(user_id = %user_id, "Failed to resolve display name: {}", e);
                UNKNOWN_SENDER.to_string()
            }
        };
        self.emitter
            .to_room_except(
                chat_id,
                Some(origin),
                &ServerEvent::UserTyping {
                    chat_id: chat_id.clone(),
                    user_id: user_id.clone(),
                    username,
                    is_typing,
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{TestHarness, chat, conn, user};

    #[tokio::test]
    async fn test_typing_is_relayed_to_room_except_origin() {
        // テスト項目: タイピングは送信元以外のルーム参加接続に届く
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let typing = TypingUseCase::new(harness.repos.users.clone(), harness.emitter.clone());
        let mut a = harness.connect("a1", Some("A")).await;
        let mut b = harness.connect("b1", Some("B")).await;
        let mut c = harness.connect("c1", Some("C")).await;
        harness.join("a1", "C123");
        harness.join("b1", "C123");

        // when (操作):
        let delivered = typing
            .execute(&conn("a1"), &user("A"), &chat("C123"), true)
            .await;

        // then (期待する結果):
        assert_eq!(delivered, 1);
        let events = b.named("user_typing");
        assert_eq!(events[0]["username"], "A");
        assert_eq!(events[0]["is_typing"], true);
        assert!(a.events().is_empty());
        assert!(c.events().is_empty());
    }

    #[tokio::test]
    async fn test_typing_from_outside_the_room_is_not_relayed() {
        // テスト項目: ルームに参加していない接続からのタイピングは中継されない
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let typing = TypingUseCase::new(harness.repos.users.clone(), harness.emitter.clone());
        let _x = harness.connect("x1", Some("X")).await;
        let mut b = harness.connect("b1", Some("B")).await;
        harness.join("b1", "C123");

        // when (操作):
        let delivered = typing
            .execute(&conn("x1"), &user("X"), &chat("C123"), true)
            .await;

        // then (期待する結果):
        assert_eq!(delivered, 0);
        assert!(b.events().is_empty());
    }
}
