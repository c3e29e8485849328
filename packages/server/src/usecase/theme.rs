//! UseCase: チャットテーマの変更

use std::sync::Arc;

use hangspace_shared::time::Clock;

use crate::domain::{ChatId, ChatRepository, ServerEvent, ThemeName, Timestamp, UserId};

use super::{EventEmitter, ensure_participant, error::ActionError};

pub struct ThemeUseCase {
    chats: Arc<dyn ChatRepository>,
    emitter: EventEmitter,
    clock: Arc<dyn Clock>,
}

impl ThemeUseCase {
    pub fn new(chats: Arc<dyn ChatRepository>, emitter: EventEmitter, clock: Arc<dyn Clock>) -> Self {
        Self {
            chats,
            emitter,
            clock,
        }
    }

    /// テーマを検証・保存し、`theme_updated` をルームに配信
    pub async fn change(
        &self,
        user_id: &UserId,
        chat_id: &ChatId,
        theme_name: &str,
    ) -> Result<ThemeName, ActionError> {
        let theme = ThemeName::new(theme_name)?;
        ensure_participant(self.chats.as_ref(), chat_id, user_id).await?;
        self.chats.save_theme(chat_id, user_id, &theme).await?;

        let updated_at = Timestamp::new(self.clock.now_millis());
        self.emitter
            .to_room_except(
                chat_id,
                None,
                &ServerEvent::ThemeUpdated {
                    chat_id: chat_id.clone(),
                    theme_name: theme.as_str().to_string(),
                    updated_by: user_id.clone(),
                    updated_at: updated_at.to_rfc3339(),
                },
            )
            .await;
        Ok(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{TestHarness, chat, user};

    #[tokio::test]
    async fn test_theme_change_is_saved_and_broadcast() {
        // テスト項目: テーマが参加者全員分に保存され、ルームに配信される
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let themes = ThemeUseCase::new(
            harness.repos.chats.clone(),
            harness.emitter.clone(),
            harness.clock.clone(),
        );
        let mut b = harness.connect("b1", Some("B")).await;
        harness.join("b1", "C123");

        // when (操作):
        themes.change(&user("A"), &chat("C123"), "ocean").await.unwrap();

        // then (期待する結果):
        assert_eq!(
            harness.store.theme_of(&chat("C123"), &user("B")).await,
            Some("ocean")
        );
        let events = b.named("theme_updated");
        assert_eq!(events[0]["theme_name"], "ocean");
        assert_eq!(events[0]["updated_by"], "A");
    }

    #[tokio::test]
    async fn test_unknown_theme_is_invalid() {
        // テスト項目: 一覧にないテーマは入力エラー
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let themes = ThemeUseCase::new(
            harness.repos.chats.clone(),
            harness.emitter.clone(),
            harness.clock.clone(),
        );

        // when (操作):
        let result = themes.change(&user("A"), &chat("C123"), "neon").await;

        // then (期待する結果):
        assert!(matches!(result, Err(ActionError::Invalid(_))));
    }
}
