//! 値オブジェクト定義
//!
//! 識別子・メッセージ本文などのプリミティブをバリデーション付きの型で包みます。
//! 生成に成功した値は常に不変条件（空でない、長さ上限以下など）を満たします。

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ValueObjectError;

/// メッセージ本文の最大文字数
pub const MAX_MESSAGE_CHARS: usize = 10_000;

/// リアクション絵文字の最大文字数
pub const MAX_EMOJI_CHARS: usize = 16;

/// 適用可能なチャットテーマ
pub const THEMES: [&str; 6] = ["default", "romantic", "dark", "nature", "ocean", "sunset"];

/// 空でない文字列識別子を定義するマクロ
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// 空白のみ・空文字列は拒否する
            pub fn new(value: String) -> Result<Self, ValueObjectError> {
                if value.trim().is_empty() {
                    return Err(ValueObjectError::Empty($label));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueObjectError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// ライブソケット 1 本ごとに一意な接続 ID
    ConnectionId,
    "connection_id"
);
string_id!(
    /// 認証レイヤーが解決した不透明なユーザー ID
    UserId,
    "user_id"
);
string_id!(
    /// チャット（= ルーム）ID
    ChatId,
    "chat_id"
);
string_id!(
    /// 永続化済みメッセージの安定 ID
    MessageId,
    "message_id"
);
string_id!(
    /// 集約通知の ID
    NotificationId,
    "notification_id"
);

/// ConnectionId の生成器
pub struct ConnectionIdFactory;

impl ConnectionIdFactory {
    /// UUID v4 から新しい ConnectionId を生成
    pub fn generate() -> ConnectionId {
        ConnectionId(uuid::Uuid::new_v4().to_string())
    }
}

/// メッセージ本文
///
/// 空白のみの本文は拒否する。保存・配信される本文は入力そのまま。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::Empty("message"));
        }
        let len = value.chars().count();
        if len > MAX_MESSAGE_CHARS {
            return Err(ValueObjectError::TooLong {
                field: "message",
                len,
                max: MAX_MESSAGE_CHARS,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MessageContent> for String {
    fn from(value: MessageContent) -> Self {
        value.0
    }
}

/// リアクション絵文字
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Emoji(String);

impl Emoji {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::Empty("emoji"));
        }
        let len = value.chars().count();
        if len > MAX_EMOJI_CHARS {
            return Err(ValueObjectError::TooLong {
                field: "emoji",
                len,
                max: MAX_EMOJI_CHARS,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Emoji {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Emoji> for String {
    fn from(value: Emoji) -> Self {
        value.0
    }
}

/// チャットテーマ名（[`THEMES`] のいずれか）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeName(&'static str);

impl ThemeName {
    pub fn new(value: &str) -> Result<Self, ValueObjectError> {
        THEMES
            .iter()
            .copied()
            .find(|theme| *theme == value)
            .map(Self)
            .ok_or_else(|| ValueObjectError::Unknown {
                field: "theme_name",
                value: value.to_string(),
            })
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// メッセージ種別
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    File,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::File => "file",
        }
    }
}

/// ユーザーのプレゼンス状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    #[default]
    Offline,
    Away,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Away => "away",
        }
    }
}

/// Unix ミリ秒（UTC）のタイムスタンプ
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// RFC 3339 形式の文字列に変換
    pub fn to_rfc3339(&self) -> String {
        hangspace_shared::time::timestamp_to_rfc3339(self.0)
    }
}
