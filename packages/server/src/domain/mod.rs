//! ドメイン層
//!
//! 値オブジェクト、エンティティ、永続化・配信のインターフェース、
//! 接続レジストリ、送信イベントモデルを定義します。

pub mod entity;
pub mod error;
pub mod event;
pub mod message_pusher;
pub mod notification;
pub mod registry;
pub mod repository;
pub mod value_object;

pub use entity::{
    ActiveSender, FileMetadata, Message, NewMessage, Notification, NotificationUpsert, ParticipantStatus,
    Reaction, UserPresence,
};
pub use error::{MessagePushError, RepositoryError, ValueObjectError};
pub use event::ServerEvent;
pub use message_pusher::{MessagePusher, PusherChannel};
pub use registry::{ClosedConnection, ConnectionRegistry, PresenceChange, RegistrySnapshot};
pub use repository::{
    ChatRepository, MessageRepository, NotificationRepository, Repositories, UserRepository,
};
#[cfg(test)]
pub use repository::{MockChatRepository, MockMessageRepository};
pub use value_object::{
    ChatId, ConnectionId, ConnectionIdFactory, Emoji, MessageContent, MessageId, MessageKind,
    NotificationId, ThemeName, Timestamp, UserId, UserStatus,
};
