//! 接続レジストリ（プレゼンス + ルームメンバーシップ）
//!
//! どの接続がどのユーザーを表し、どのチャットルームに参加しているかを保持します。
//!
//! ## 並行性
//!
//! `DashMap` によりシャード単位でロックされるため、無関係なチャット・ユーザーへの
//! 操作は直列化されません。各メソッドは同期的で、ロックを保持したまま await する
//! 経路は存在しません。複数のマップにまたがる更新では、片方の参照を解放してから
//! もう片方に触れます。
//!
//! 同一接続に対する操作は、その接続の受信ループから順番に呼ばれる前提です
//! （join と close が同じ接続で競合することはない）。

use std::collections::{BTreeMap, HashSet};

use dashmap::{DashMap, mapref::entry::Entry};
use serde::Serialize;

use super::value_object::{ChatId, ConnectionId, UserId};

/// ユーザー単位のプレゼンス遷移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceChange {
    /// ユーザー最初の接続（offline → online）
    CameOnline,
    /// 既に別の接続がある
    AlreadyOnline,
    /// ユーザー最後の接続が切れた（online → offline）
    WentOffline,
    /// まだ別の接続が残っている
    StillOnline,
}

/// 接続クローズの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedConnection {
    /// 認証済みだった場合のユーザーとプレゼンス遷移
    pub presence: Option<(UserId, PresenceChange)>,
    /// 退出させたルーム
    pub rooms: Vec<ChatId>,
}

/// デバッグ用のスナップショット
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    pub connections: usize,
    pub authenticated_connections: usize,
    pub online_users: Vec<UserId>,
    pub rooms: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
struct ConnectionEntry {
    user_id: Option<UserId>,
    rooms: HashSet<ChatId>,
}

/// 接続レジストリ
///
/// サーバー起動時に生成し、AppState 経由で注入する。シャットダウン時に [`clear`] する。
///
/// [`clear`]: ConnectionRegistry::clear
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    users: DashMap<UserId, HashSet<ConnectionId>>,
    rooms: DashMap<ChatId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// トランスポート接続時に接続を登録（未認証状態）
    pub fn open(&self, connection_id: ConnectionId) {
        self.connections
            .entry(connection_id)
            .or_insert_with(|| ConnectionEntry {
                user_id: None,
                rooms: HashSet::new(),
            });
    }

    /// 接続をユーザーに紐付ける
    ///
    /// 未登録の接続、または別ユーザーに紐付いた接続に対しては `None`。
    pub fn register(&self, connection_id: &ConnectionId, user_id: UserId) -> Option<PresenceChange> {
        {
            let mut entry = self.connections.get_mut(connection_id)?;
            match &entry.user_id {
                Some(existing) if existing == &user_id => {
                    return Some(PresenceChange::AlreadyOnline);
                }
                Some(_) => return None,
                None => entry.user_id = Some(user_id.clone()),
            }
        }

        let mut connections = self.users.entry(user_id).or_default();
        let first = connections.is_empty();
        connections.insert(connection_id.clone());
        Some(if first {
            PresenceChange::CameOnline
        } else {
            PresenceChange::AlreadyOnline
        })
    }

    /// 接続とユーザーの紐付けを解除
    ///
    /// 未認証の接続に対しては `None`（エラーではない）。
    pub fn unregister(&self, connection_id: &ConnectionId) -> Option<(UserId, PresenceChange)> {
        let user_id = self
            .connections
            .get_mut(connection_id)
            .and_then(|mut entry| entry.user_id.take())?;

        let change = match self.users.entry(user_id.clone()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().remove(connection_id);
                if entry.get().is_empty() {
                    entry.remove();
                    PresenceChange::WentOffline
                } else {
                    PresenceChange::StillOnline
                }
            }
            Entry::Vacant(_) => PresenceChange::WentOffline,
        };
        Some((user_id, change))
    }

    /// ルームに参加（冪等）。新規に参加した場合のみ `true`
    pub fn join(&self, connection_id: &ConnectionId, chat_id: &ChatId) -> bool {
        let newly_joined = match self.connections.get_mut(connection_id) {
            Some(mut entry) => entry.rooms.insert(chat_id.clone()),
            None => return false,
        };
        if newly_joined {
            self.rooms
                .entry(chat_id.clone())
                .or_default()
                .insert(connection_id.clone());
        }
        newly_joined
    }

    /// ルームから退出（冪等）。実際に退出した場合のみ `true`
    pub fn leave(&self, connection_id: &ConnectionId, chat_id: &ChatId) -> bool {
        let was_member = self
            .connections
            .get_mut(connection_id)
            .is_some_and(|mut entry| entry.rooms.remove(chat_id));
        if was_member {
            self.remove_from_room(chat_id, connection_id);
        }
        was_member
    }

    /// 接続を全ルームから退出させる
    pub fn purge_rooms(&self, connection_id: &ConnectionId) -> Vec<ChatId> {
        let rooms = self
            .connections
            .get_mut(connection_id)
            .map(|mut entry| std::mem::take(&mut entry.rooms))
            .unwrap_or_default();
        for chat_id in &rooms {
            self.remove_from_room(chat_id, connection_id);
        }
        let mut rooms: Vec<ChatId> = rooms.into_iter().collect();
        rooms.sort();
        rooms
    }

    /// 切断時のクリーンアップ（ルーム退出 → プレゼンス解除 → 接続削除）
    pub fn close(&self, connection_id: &ConnectionId) -> ClosedConnection {
        let rooms = self.purge_rooms(connection_id);
        let presence = self.unregister(connection_id);
        self.connections.remove(connection_id);
        ClosedConnection { presence, rooms }
    }

    /// ルームに参加中の接続
    pub fn members_of(&self, chat_id: &ChatId) -> Vec<ConnectionId> {
        let mut members: Vec<ConnectionId> = self
            .rooms
            .get(chat_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    /// ユーザーのアイデンティティチャンネル（そのユーザーの全接続）
    pub fn connections_of(&self, user_id: &UserId) -> Vec<ConnectionId> {
        let mut connections: Vec<ConnectionId> = self
            .users
            .get(user_id)
            .map(|connections| connections.iter().cloned().collect())
            .unwrap_or_default();
        connections.sort();
        connections
    }

    /// 登録済みの全接続
    pub fn all_connections(&self) -> Vec<ConnectionId> {
        let mut connections: Vec<ConnectionId> =
            self.connections.iter().map(|entry| entry.key().clone()).collect();
        connections.sort();
        connections
    }

    pub fn user_of(&self, connection_id: &ConnectionId) -> Option<UserId> {
        self.connections
            .get(connection_id)
            .and_then(|entry| entry.user_id.clone())
    }

    pub fn rooms_of(&self, connection_id: &ConnectionId) -> Vec<ChatId> {
        let mut rooms: Vec<ChatId> = self
            .connections
            .get(connection_id)
            .map(|entry| entry.rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    /// ユーザーに 1 本以上の接続があるか
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.users
            .get(user_id)
            .is_some_and(|connections| !connections.is_empty())
    }

    /// 全エントリを破棄（シャットダウン時）
    pub fn clear(&self) {
        self.rooms.clear();
        self.users.clear();
        self.connections.clear();
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut online_users: Vec<UserId> =
            self.users.iter().map(|entry| entry.key().clone()).collect();
        online_users.sort();
        RegistrySnapshot {
            connections: self.connections.len(),
            authenticated_connections: self
                .connections
                .iter()
                .filter(|entry| entry.user_id.is_some())
                .count(),
            online_users,
            rooms: self
                .rooms
                .iter()
                .map(|entry| (entry.key().as_str().to_string(), entry.value().len()))
                .collect(),
        }
    }

    fn remove_from_room(&self, chat_id: &ChatId, connection_id: &ConnectionId) {
        if let Entry::Occupied(mut entry) = self.rooms.entry(chat_id.clone()) {
            entry.get_mut().remove(connection_id);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id.to_string()).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn chat(id: &str) -> ChatId {
        ChatId::new(id.to_string()).unwrap()
    }

    fn registry_with(connections: &[&str]) -> ConnectionRegistry {
        let registry = ConnectionRegistry::new();
        for id in connections {
            registry.open(conn(id));
        }
        registry
    }

    #[test]
    fn test_register_first_and_additional_connections() {
        // テスト項目: 最初の接続だけが CameOnline になる
        // given (前提条件):
        let registry = registry_with(&["c1", "c2"]);

        // when (操作):
        let first = registry.register(&conn("c1"), user("alice"));
        let second = registry.register(&conn("c2"), user("alice"));

        // then (期待する結果):
        assert_eq!(first, Some(PresenceChange::CameOnline));
        assert_eq!(second, Some(PresenceChange::AlreadyOnline));
        assert_eq!(registry.connections_of(&user("alice")), vec![conn("c1"), conn("c2")]);
        assert!(registry.is_online(&user("alice")));
    }

    #[test]
    fn test_register_unknown_connection_is_ignored() {
        // テスト項目: open されていない接続の登録は無視される
        // given (前提条件):
        let registry = ConnectionRegistry::new();

        // when (操作):
        let result = registry.register(&conn("ghost"), user("alice"));

        // then (期待する結果):
        assert_eq!(result, None);
        assert!(!registry.is_online(&user("alice")));
    }

    #[test]
    fn test_unregister_last_connection_goes_offline() {
        // テスト項目: 最後の接続の解除だけが WentOffline になる
        // given (前提条件):
        let registry = registry_with(&["c1", "c2"]);
        registry.register(&conn("c1"), user("alice"));
        registry.register(&conn("c2"), user("alice"));

        // when (操作):
        let first = registry.unregister(&conn("c1"));
        let second = registry.unregister(&conn("c2"));

        // then (期待する結果):
        assert_eq!(first, Some((user("alice"), PresenceChange::StillOnline)));
        assert_eq!(second, Some((user("alice"), PresenceChange::WentOffline)));
        assert!(!registry.is_online(&user("alice")));
    }

    #[test]
    fn test_unregister_unauthenticated_is_noop() {
        // テスト項目: 未認証接続の解除は None を返すだけ
        // given (前提条件):
        let registry = registry_with(&["c1"]);

        // when (操作):
        let result = registry.unregister(&conn("c1"));

        // then (期待する結果):
        assert_eq!(result, None);
    }

    #[test]
    fn test_join_is_idempotent() {
        // テスト項目: 同じルームへの 2 回目の join は効果がない
        // given (前提条件):
        let registry = registry_with(&["c1"]);

        // when (操作):
        let first = registry.join(&conn("c1"), &chat("C123"));
        let second = registry.join(&conn("c1"), &chat("C123"));

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(registry.members_of(&chat("C123")), vec![conn("c1")]);
    }

    #[test]
    fn test_leave_is_idempotent_and_drops_empty_room() {
        // テスト項目: leave は冪等で、空になったルームは削除される
        // given (前提条件):
        let registry = registry_with(&["c1"]);
        registry.join(&conn("c1"), &chat("C123"));

        // when (操作):
        let first = registry.leave(&conn("c1"), &chat("C123"));
        let second = registry.leave(&conn("c1"), &chat("C123"));

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert!(registry.members_of(&chat("C123")).is_empty());
        assert!(registry.snapshot().rooms.is_empty());
    }

    #[test]
    fn test_join_unknown_connection_leaves_no_dangling_membership() {
        // テスト項目: 未登録接続の join はルームに残らない
        // given (前提条件):
        let registry = ConnectionRegistry::new();

        // when (操作):
        let joined = registry.join(&conn("ghost"), &chat("C123"));

        // then (期待する結果):
        assert!(!joined);
        assert!(registry.members_of(&chat("C123")).is_empty());
    }

    #[test]
    fn test_close_removes_connection_from_every_room() {
        // テスト項目: 切断で全ルームから退出し、最後の接続ならオフラインになる
        // given (前提条件):
        let registry = registry_with(&["c1", "c2"]);
        registry.register(&conn("c1"), user("alice"));
        registry.register(&conn("c2"), user("bob"));
        registry.join(&conn("c1"), &chat("C1"));
        registry.join(&conn("c1"), &chat("C2"));
        registry.join(&conn("c2"), &chat("C2"));

        // when (操作):
        let closed = registry.close(&conn("c1"));

        // then (期待する結果):
        assert_eq!(closed.rooms, vec![chat("C1"), chat("C2")]);
        assert_eq!(
            closed.presence,
            Some((user("alice"), PresenceChange::WentOffline))
        );
        assert!(registry.members_of(&chat("C1")).is_empty());
        assert_eq!(registry.members_of(&chat("C2")), vec![conn("c2")]);
        assert_eq!(registry.user_of(&conn("c1")), None);
        assert_eq!(registry.all_connections(), vec![conn("c2")]);
    }

    #[test]
    fn test_clear_drops_everything() {
        // テスト項目: clear で全エントリが破棄される
        // given (前提条件):
        let registry = registry_with(&["c1"]);
        registry.register(&conn("c1"), user("alice"));
        registry.join(&conn("c1"), &chat("C1"));

        // when (操作):
        registry.clear();

        // then (期待する結果):
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.connections, 0);
        assert!(snapshot.online_users.is_empty());
        assert!(snapshot.rooms.is_empty());
    }

    #[test]
    fn test_concurrent_joins_to_same_room() {
        // テスト項目: 複数スレッドから同じルームへ join しても取りこぼしがない
        // given (前提条件):
        let registry = std::sync::Arc::new(ConnectionRegistry::new());
        let ids: Vec<String> = (0..32).map(|i| format!("c{i}")).collect();
        for id in &ids {
            registry.open(conn(id));
        }

        // when (操作):
        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .map(|id| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.join(&conn(&id), &chat("C1")))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        // then (期待する結果):
        assert_eq!(registry.members_of(&chat("C1")).len(), 32);
    }
}
