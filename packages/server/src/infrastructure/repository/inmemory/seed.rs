//! 起動時のシードデータ
//!
//! プロフィール作成・チャット作成は本サーバーの範囲外のため、
//! JSON ファイルからユーザーとチャットを読み込んでストアに投入します。
//!
//! ```json
//! {
//!   "users": [{ "id": "alice", "display_name": "Alice" }],
//!   "chats": [{ "id": "C123", "participants": ["alice", "bob"] }]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{ChatId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedUser {
    pub id: UserId,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedChat {
    pub id: ChatId,
    pub participants: Vec<UserId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SeedFixture {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub chats: Vec<SeedChat>,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid seed file: {0}")]
    Json(#[from] serde_json::Error),
}

impl SeedFixture {
    /// JSON ファイルから読み込む
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(raw)?)
    }
}
