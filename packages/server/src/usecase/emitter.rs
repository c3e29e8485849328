//! 送信イベントの宛先解決と配信
//!
//! `ConnectionRegistry` で宛先（接続・ルーム・アイデンティティチャンネル・全体）を解決し、
//! `MessagePusher` で配信します。配信はベストエフォートで、途中で消えた接続は
//! スキップされます。レジストリのロックは宛先の解決時にだけ取得され、
//! 配信（await）の間は保持されません。

use std::sync::Arc;

use crate::domain::{ChatId, ConnectionId, ConnectionRegistry, MessagePusher, ServerEvent, UserId};

#[derive(Clone)]
pub struct EventEmitter {
    registry: Arc<ConnectionRegistry>,
    pusher: Arc<dyn MessagePusher>,
}

impl EventEmitter {
    pub fn new(registry: Arc<ConnectionRegistry>, pusher: Arc<dyn MessagePusher>) -> Self {
        Self { registry, pusher }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn pusher(&self) -> &Arc<dyn MessagePusher> {
        &self.pusher
    }

    fn encode(event: &ServerEvent) -> Option<String> {
        match event.to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!(event = event.name(), "Failed to serialize event: {}", e);
                None
            }
        }
    }

    /// 1 つの接続へ送信。届いた場合のみ `true`
    pub async fn to_connection(&self, connection_id: &ConnectionId, event: &ServerEvent) -> bool {
        let Some(json) = Self::encode(event) else {
            return false;
        };
        match self.pusher.push_to(connection_id, &json).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    event = event.name(),
                    "Failed to emit event: {}",
                    e
                );
                false
            }
        }
    }

    /// ルームの参加接続へ送信（`except` の接続は除く）。届いた接続数を返す
    pub async fn to_room_except(
        &self,
        chat_id: &ChatId,
        except: Option<&ConnectionId>,
        event: &ServerEvent,
    ) -> usize {
        let targets: Vec<ConnectionId> = self
            .registry
            .members_of(chat_id)
            .into_iter()
            .filter(|member| Some(member) != except)
            .collect();
        self.broadcast(targets, event).await
    }

    /// ユーザーのアイデンティティチャンネル（そのユーザーの全接続）へ送信
    pub async fn to_user(&self, user_id: &UserId, event: &ServerEvent) -> usize {
        let targets = self.registry.connections_of(user_id);
        self.broadcast(targets, event).await
    }

    /// 全接続へ送信
    pub async fn to_all(&self, event: &ServerEvent) -> usize {
        let targets = self.registry.all_connections();
        self.broadcast(targets, event).await
    }

    async fn broadcast(&self, targets: Vec<ConnectionId>, event: &ServerEvent) -> usize {
        if targets.is_empty() {
            return 0;
        }
        let Some(json) = Self::encode(event) else {
            return 0;
        };
        let delivered = self.pusher.broadcast(targets, &json).await;
        tracing::debug!(event = event.name(), delivered, "Broadcasted event");
        delivered
    }
}
