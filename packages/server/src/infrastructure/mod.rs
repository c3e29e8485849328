//! Infrastructure 層
//!
//! - `dto`: ワイヤ上の JSON 形式（WebSocket フレーム、HTTP リクエスト・レスポンス）
//! - `message_pusher`: `MessagePusher` の WebSocket 実装
//! - `repository`: 永続化コラボレーターの InMemory 実装

pub mod dto;
pub mod message_pusher;
pub mod repository;
