//! ドメイン層のエラー定義

use thiserror::Error;

/// 値オブジェクト生成時のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} is too long ({len} > {max} characters)")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("unknown {field}: '{value}'")]
    Unknown { field: &'static str, value: String },
}

/// 永続化コラボレーターのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// 対象が存在しない、または呼び出し元に見せてはいけない
    #[error("{0} not found")]
    NotFound(String),

    /// 対象は存在するが、操作の前提条件を満たさない（削除済みメッセージの編集など）
    #[error("conflict: {0}")]
    Conflict(String),

    /// ストレージ自体の失敗
    #[error("storage failure: {0}")]
    Storage(String),
}

/// メッセージ配信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' not found")]
    ClientNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}
