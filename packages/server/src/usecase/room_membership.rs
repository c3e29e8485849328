//! UseCase: ルーム参加・退出
//!
//! 参加・退出はレジストリ上で冪等です。`verify_join` が有効な場合のみ、
//! 参加前にチャット参加者かどうかを永続化コラボレーターに問い合わせます。

use std::sync::Arc;

use crate::domain::{ChatId, ChatRepository, ConnectionId, ConnectionRegistry, UserId};

use super::{ensure_participant, error::ActionError};

pub struct RoomMembershipUseCase {
    registry: Arc<ConnectionRegistry>,
    chats: Arc<dyn ChatRepository>,
    verify_join: bool,
}

impl RoomMembershipUseCase {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        chats: Arc<dyn ChatRepository>,
        verify_join: bool,
    ) -> Self {
        Self {
            registry,
            chats,
            verify_join,
        }
    }

    /// ルームに参加。新規に参加した場合のみ `true`
    pub async fn join(
        &self,
        connection_id: &ConnectionId,
        user_id: &UserId,
        chat_id: &ChatId,
    ) -> Result<bool, ActionError> {
        if self.verify_join {
            ensure_participant(self.chats.as_ref(), chat_id, user_id).await?;
        }
        let joined = self.registry.join(connection_id, chat_id);
        tracing::debug!(
            connection_id = %connection_id,
            user_id = %user_id,
            chat_id = %chat_id,
            joined,
            "join_chat"
        );
        Ok(joined)
    }

    /// ルームから退出。実際に退出した場合のみ `true`
    pub fn leave(&self, connection_id: &ConnectionId, chat_id: &ChatId) -> bool {
        let left = self.registry.leave(connection_id, chat_id);
        tracing::debug!(connection_id = %connection_id, chat_id = %chat_id, left, "leave_chat");
        left
    }
}
