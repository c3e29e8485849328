//! ユースケースのテスト用フィクスチャ
//!
//! シード済みの InMemoryStore、レジストリ、WebSocket pusher を組み立て、
//! 接続ごとに受信チャンネルを持つテストクライアントを提供します。

use std::sync::Arc;

use hangspace_shared::time::{Clock, FixedClock};
use tokio::sync::mpsc;

use super::{ChatSettings, EventEmitter};
use crate::{
    domain::{
        ChatId, ConnectionId, ConnectionRegistry, Message, MessageContent, MessageId, MessageKind,
        MessagePusher, MessageRepository, NewMessage, NotificationId, Repositories, Timestamp,
        UserId,
    },
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryStore},
};

pub(crate) const NOW: i64 = 1_700_000_000_000;

pub(crate) fn user(id: &str) -> UserId {
    UserId::new(id.to_string()).unwrap()
}

pub(crate) fn chat(id: &str) -> ChatId {
    ChatId::new(id.to_string()).unwrap()
}

pub(crate) fn conn(id: &str) -> ConnectionId {
    ConnectionId::new(id.to_string()).unwrap()
}

pub(crate) fn message_id(id: &str) -> MessageId {
    MessageId::new(id.to_string()).unwrap()
}

pub(crate) fn notification_id(id: &str) -> NotificationId {
    NotificationId::new(id.to_string()).unwrap()
}

/// 1 接続分の受信側
pub(crate) struct TestClient {
    rx: mpsc::UnboundedReceiver<String>,
}

impl TestClient {
    /// 受信済みのフレームをすべて取り出す
    pub(crate) fn events(&mut self) -> Vec<serde_json::Value> {
        let mut events = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            events.push(serde_json::from_str(&frame).unwrap());
        }
        events
    }

    /// 受信済みのフレームのうち、指定したイベント名の data だけを取り出す
    pub(crate) fn named(&mut self, name: &str) -> Vec<serde_json::Value> {
        self.events()
            .into_iter()
            .filter(|event| event["event"] == name)
            .map(|event| event["data"].clone())
            .collect()
    }
}

pub(crate) struct TestHarness {
    pub store: Arc<InMemoryStore>,
    pub repos: Repositories,
    pub registry: Arc<ConnectionRegistry>,
    pub pusher: Arc<dyn MessagePusher>,
    pub emitter: EventEmitter,
    pub clock: Arc<dyn Clock>,
    pub settings: ChatSettings,
}

impl TestHarness {
    /// ユーザー A, B, C, X とチャット C123 (A, B)、G1 (A, B, C) をシード
    pub(crate) async fn seeded() -> Self {
        let store = Arc::new(InMemoryStore::new());
        for id in ["A", "B", "C", "X"] {
            store.add_user(user(id), id).await;
        }
        store.add_chat(chat("C123"), vec![user("A"), user("B")]).await;
        store
            .add_chat(chat("G1"), vec![user("A"), user("B"), user("C")])
            .await;
        let repos = Repositories::from_store(store.clone());
        Self::build(store, repos)
    }

    /// 任意の Repository 実装（失敗注入・モック）で組み立てる
    pub(crate) fn with_repos(repos: Repositories) -> Self {
        Self::build(Arc::new(InMemoryStore::new()), repos)
    }

    fn build(store: Arc<InMemoryStore>, repos: Repositories) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());
        let emitter = EventEmitter::new(registry.clone(), pusher.clone());
        Self {
            store,
            repos,
            registry,
            pusher,
            emitter,
            clock: Arc::new(FixedClock::new(NOW)),
            settings: ChatSettings::default(),
        }
    }

    /// 接続を開き、`user_id` があればレジストリに紐付ける（永続化は行わない）
    pub(crate) async fn connect(&self, connection_id: &str, user_id: Option<&str>) -> TestClient {
        let (tx, rx) = mpsc::unbounded_channel();
        self.pusher.register_client(conn(connection_id), tx).await;
        self.registry.open(conn(connection_id));
        if let Some(user_id) = user_id {
            self.registry.register(&conn(connection_id), user(user_id));
        }
        TestClient { rx }
    }

    pub(crate) fn join(&self, connection_id: &str, chat_id: &str) {
        self.registry.join(&conn(connection_id), &chat(chat_id));
    }

    /// テキストメッセージを直接永続化する
    pub(crate) async fn seed_message(&self, chat_id: &str, sender: &str, content: &str) -> Message {
        self.repos
            .messages
            .create_message(NewMessage {
                chat_id: chat(chat_id),
                sender_id: user(sender),
                content: MessageContent::new(content.to_string()).unwrap(),
                kind: MessageKind::Text,
                file: None,
                created_at: Timestamp::new(NOW),
            })
            .await
            .unwrap()
    }
}
