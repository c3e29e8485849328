//! MessagePusher trait 定義
//!
//! 接続へのメッセージ送信（通知）を抽象化します。
//! WebSocket などの具体的な実装は Infrastructure 層が提供します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, MessagePushError};

/// 1 接続分の送信チャンネル
///
/// UI 層の pusher ループがこのチャンネルを読み出してソケットへ書き込む。
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// 接続へのメッセージ送信インターフェース
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続と送信チャンネルを登録
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続の登録を解除
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// 特定の接続へ送信
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続へ送信（ベストエフォート）
    ///
    /// 途中で消えた接続はスキップし、全体を失敗にはしない。
    /// 実際に送信できた接続数を返す。
    async fn broadcast(&self, targets: Vec<ConnectionId>, content: &str) -> usize;

    /// 登録済みの全接続
    async fn connected_clients(&self) -> Vec<ConnectionId>;
}
