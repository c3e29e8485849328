//! UseCase: 切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectClientUseCase::execute()
//! - 全ルームからの退出、pusher からの登録解除が無条件に行われること
//! - 最後の接続でのみ offline（last_seen 付き）が永続化され、`user_offline` が配信されること
//!
//! ### どのような状況を想定しているか
//! - 正常系：最後の接続、まだ接続が残っている場合、未認証の接続
//! - 競合：offline の書き込み中に同じユーザーが再接続した場合

use std::sync::Arc;

use hangspace_shared::time::Clock;

use crate::domain::{
    ClosedConnection, ConnectionId, PresenceChange, ServerEvent, Timestamp, UserId,
    UserRepository, UserStatus,
};

use super::{EventEmitter, error::PresenceError};

/// 切断のユースケース
pub struct DisconnectClientUseCase {
    users: Arc<dyn UserRepository>,
    emitter: EventEmitter,
    clock: Arc<dyn Clock>,
}

impl DisconnectClientUseCase {
    pub fn new(users: Arc<dyn UserRepository>, emitter: EventEmitter, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            emitter,
            clock,
        }
    }

    /// 切断を実行
    ///
    /// レジストリのクリーンアップは永続化の成否に関わらず先に完了する。
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<ClosedConnection, PresenceError> {
        let closed = self.emitter.registry().close(connection_id);
        self.emitter.pusher().unregister_client(connection_id).await;

        tracing::debug!(
            connection_id = %connection_id,
            rooms = closed.rooms.len(),
            "Connection removed from registry"
        );

        if let Some((user_id, PresenceChange::WentOffline)) = &closed.presence {
            self.go_offline(user_id).await?;
        }

        Ok(closed)
    }

    async fn go_offline(&self, user_id: &UserId) -> Result<(), PresenceError> {
        let last_seen = Timestamp::new(self.clock.now_millis());
        self.users
            .set_status(user_id, UserStatus::Offline, last_seen)
            .await?;

        // offline の書き込み中に再接続していれば online に戻す
        if self.emitter.registry().is_online(user_id) {
            tracing::info!(user_id = %user_id, "User reconnected while going offline");
            self.users
                .set_status(user_id, UserStatus::Online, last_seen)
                .await?;
            return Ok(());
        }

        let delivered = self
            .emitter
            .to_all(&ServerEvent::UserOffline {
                user_id: user_id.clone(),
                last_seen: last_seen.to_rfc3339(),
            })
            .await;
        tracing::info!(user_id = %user_id, delivered, "User went offline");
        Ok(())
    }
}
