//! UseCase: 接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectClientUseCase::attach() / authenticate()
//! - 最初の接続でのみ online が永続化され、`user_online` が全接続に配信されること
//!
//! ### どのような状況を想定しているか
//! - 正常系：最初の接続、2 本目の接続
//! - 異常系：開かれていない接続、永続化の失敗

use std::sync::Arc;

use hangspace_shared::time::Clock;

use crate::domain::{
    ConnectionId, PresenceChange, PusherChannel, ServerEvent, Timestamp, UserId, UserRepository,
    UserStatus,
};

use super::{EventEmitter, error::PresenceError};

/// 接続のユースケース
pub struct ConnectClientUseCase {
    users: Arc<dyn UserRepository>,
    emitter: EventEmitter,
    clock: Arc<dyn Clock>,
}

impl ConnectClientUseCase {
    pub fn new(users: Arc<dyn UserRepository>, emitter: EventEmitter, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            emitter,
            clock,
        }
    }

    /// トランスポート接続を受け付ける（未認証状態）
    ///
    /// 送信チャンネルを pusher に登録し、レジストリに接続を開く。
    pub async fn attach(&self, connection_id: ConnectionId, sender: PusherChannel) {
        self.emitter
            .pusher()
            .register_client(connection_id.clone(), sender)
            .await;
        self.emitter.registry().open(connection_id);
    }

    /// 接続をユーザーに紐付ける
    ///
    /// ユーザーの最初の接続であれば、online を永続化してから
    /// `user_online` を全接続に配信する。
    pub async fn authenticate(
        &self,
        connection_id: &ConnectionId,
        user_id: UserId,
    ) -> Result<PresenceChange, PresenceError> {
        let change = self
            .emitter
            .registry()
            .register(connection_id, user_id.clone())
            .ok_or_else(|| PresenceError::ConnectionNotOpen(connection_id.to_string()))?;

        if change == PresenceChange::CameOnline {
            let now = Timestamp::new(self.clock.now_millis());
            self.users
                .set_status(&user_id, UserStatus::Online, now)
                .await?;
            let delivered = self
                .emitter
                .to_all(&ServerEvent::UserOnline {
                    user_id: user_id.clone(),
                })
                .await;
            tracing::info!(user_id = %user_id, delivered, "User came online");
        }

        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{TestHarness, conn, user};
    use tokio::sync::mpsc;

    fn usecase(harness: &TestHarness) -> ConnectClientUseCase {
        ConnectClientUseCase::new(
            harness.repos.users.clone(),
            harness.emitter.clone(),
            harness.clock.clone(),
        )
    }

    #[tokio::test]
    async fn test_first_connection_persists_online_and_broadcasts() {
        // テスト項目: 最初の接続で online が永続化され、user_online が全接続に届く
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let connect = usecase(&harness);
        let mut watcher = harness.connect("w1", Some("C")).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        connect.attach(conn("a1"), tx).await;

        // when (操作):
        let change = connect.authenticate(&conn("a1"), user("A")).await.unwrap();

        // then (期待する結果):
        assert_eq!(change, PresenceChange::CameOnline);
        let presence = harness.repos.users.presence(&user("A")).await.unwrap();
        assert_eq!(presence.status, UserStatus::Online);
        let online = watcher.named("user_online");
        assert_eq!(online.len(), 1);
        assert_eq!(online[0]["user_id"], "A");
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_second_connection_does_not_broadcast() {
        // テスト項目: 2 本目の接続では user_online は配信されない
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let connect = usecase(&harness);
        let mut watcher = harness.connect("w1", Some("C")).await;
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        connect.attach(conn("a1"), tx1).await;
        connect.attach(conn("a2"), tx2).await;
        connect.authenticate(&conn("a1"), user("A")).await.unwrap();
        watcher.events();

        // when (操作):
        let change = connect.authenticate(&conn("a2"), user("A")).await.unwrap();

        // then (期待する結果):
        assert_eq!(change, PresenceChange::AlreadyOnline);
        assert!(watcher.named("user_online").is_empty());
        assert_eq!(harness.registry.connections_of(&user("A")).len(), 2);
    }

    #[tokio::test]
    async fn test_authenticate_unknown_connection_fails() {
        // テスト項目: 開かれていない接続は認証できない
        // given (前提条件):
        let harness = TestHarness::seeded().await;
        let connect = usecase(&harness);

        // when (操作):
        let result = connect.authenticate(&conn("ghost"), user("A")).await;

        // then (期待する結果):
        assert!(matches!(result, Err(PresenceError::ConnectionNotOpen(_))));
        assert!(!harness.registry.is_online(&user("A")));
    }
}
