//! UseCase: プレゼンスの問い合わせ
//!
//! チャット参加者の初期ステータスと、単一ユーザーのステータスを返します。
//! 永続化されたステータスを正とします（接続・切断時に同期的に更新されるため）。

use std::sync::Arc;

use crate::domain::{
    ChatId, ChatRepository, ConnectionId, ParticipantStatus, RepositoryError, ServerEvent,
    UserId, UserRepository, UserStatus, event::StatusPayload, notification::UNKNOWN_SENDER,
};

use super::{EventEmitter, ensure_participant, error::ActionError};

pub struct PresenceQueryUseCase {
    users: Arc<dyn UserRepository>,
    chats: Arc<dyn ChatRepository>,
    emitter: EventEmitter,
}

impl PresenceQueryUseCase {
    pub fn new(
        users: Arc<dyn UserRepository>,
        chats: Arc<dyn ChatRepository>,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            users,
            chats,
            emitter,
        }
    }

    /// ユーザーのステータス（プロフィールがなければ offline の Unknown）
    pub async fn user_status(&self, user_id: &UserId) -> Result<ParticipantStatus, ActionError> {
        match self.users.presence(user_id).await {
            Ok(presence) => Ok(presence.into()),
            Err(RepositoryError::NotFound(_)) => Ok(ParticipantStatus {
                user_id: user_id.clone(),
                status: UserStatus::Offline,
                username: UNKNOWN_SENDER.to_string(),
                last_seen: None,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// 要求者以外のチャット参加者のステータス
    pub async fn chat_statuses(
        &self,
        requester: &UserId,
        chat_id: &ChatId,
    ) -> Result<Vec<ParticipantStatus>, ActionError> {
        let participants = ensure_participant(self.chats.as_ref(), chat_id, requester).await?;
        let mut statuses = Vec::with_capacity(participants.len().saturating_sub(1));
        for participant in participants.iter().filter(|p| *p != requester) {
            statuses.push(self.user_status(participant).await?);
        }
        Ok(statuses)
    }

    /// `request_initial_statuses`: 要求した接続にだけ `initial_statuses` を返す
    pub async fn send_initial_statuses(
        &self,
        connection_id: &ConnectionId,
        requester: &UserId,
        chat_id: &ChatId,
    ) -> Result<(), ActionError> {
        let statuses = self.chat_statuses(requester, chat_id).await?;
        self.emitter
            .to_connection(
                connection_id,
                &ServerEvent::InitialStatuses {
                    chat_id: chat_id.clone(),
                    statuses: statuses.iter().map(StatusPayload::from).collect(),
                },
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Timestamp,
        usecase::test_support::{NOW, TestHarness, chat, conn, user},
    };

    fn usecase(harness: &TestHarness) -> PresenceQueryUseCase {
        PresenceQueryUseCase::new(
            harness.repos.users.clone(),
            harness.repos.chats.clone(),
            harness.emitter.clone(),
        )
    }

    #[tokio::test]
    async fn test_initial_statuses_exclude_requester() {
        // テスト項目: 初期ステータスは要求者以外の参加者分だけ、要求した接続に届く
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let presence = usecase(&harness);
        harness
            .repos
            .users
            .set_status(&user("B"), UserStatus::Online, Timestamp::new(NOW))
            .await
            .unwrap();
        let mut a = harness.connect("a1", Some("A")).await;

        // when (操作):
        presence
            .send_initial_statuses(&conn("a1"), &user("A"), &chat("G1"))
            .await
            .unwrap();

        // then (期待する結果):
        let events = a.named("initial_statuses");
        assert_eq!(events.len(), 1);
        let statuses = events[0]["statuses"].as_array().unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0]["user_id"], "B");
        assert_eq!(statuses[0]["status"], "online");
        assert_eq!(statuses[1]["user_id"], "C");
        assert_eq!(statuses[1]["status"], "offline");
        assert!(statuses[1]["last_seen"].is_null());
    }

    #[tokio::test]
    async fn test_non_participant_gets_nothing() {
        // テスト項目: 参加者でない要求者には何も返らない（NotFound）
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let presence = usecase(&harness);
        let mut x = harness.connect("x1", Some("X")).await;

        // when (操作):
        let result = presence
            .send_initial_statuses(&conn("x1"), &user("X"), &chat("C123"))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ActionError::NotFound(_))));
        assert!(x.events().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_status_is_offline() {
        // テスト項目: プロフィールのないユーザーは offline / Unknown
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let presence = usecase(&harness);

        // when (操作):
        let status = presence.user_status(&user("nobody")).await.unwrap();

        // then (期待する結果):
        assert_eq!(status.status, UserStatus::Offline);
        assert_eq!(status.username, "Unknown");
    }
}
