//! Server state and use case wiring.

use std::sync::Arc;

use hangspace_shared::time::Clock;

use crate::{
    domain::{ConnectionRegistry, MessagePusher, Repositories},
    usecase::{
        ChatSettings, ConnectClientUseCase, DisconnectClientUseCase, EventEmitter,
        MessageLifecycleUseCase, NotificationUseCase, PresenceQueryUseCase, ReactionUseCase,
        ReadReceiptUseCase, RoomMembershipUseCase, SendMessageUseCase, ThemeUseCase,
        TypingUseCase,
    },
};

use super::{
    dispatcher::{DispatcherError, EventDispatcher},
    handler::events::handler_table,
};

/// Shared application state
pub struct AppState {
    /// ConnectionRegistry（接続・ユーザー・ルームの対応表）
    pub registry: Arc<ConnectionRegistry>,
    /// EventEmitter（ルーム・ユーザー単位の配信）
    pub emitter: EventEmitter,
    /// 接続開始と認証
    pub connect_client_usecase: Arc<ConnectClientUseCase>,
    /// 接続終了とオフライン遷移
    pub disconnect_client_usecase: Arc<DisconnectClientUseCase>,
    pub room_membership_usecase: Arc<RoomMembershipUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub typing_usecase: Arc<TypingUseCase>,
    pub read_receipt_usecase: Arc<ReadReceiptUseCase>,
    pub notification_usecase: Arc<NotificationUseCase>,
    pub reaction_usecase: Arc<ReactionUseCase>,
    pub presence_query_usecase: Arc<PresenceQueryUseCase>,
    pub message_lifecycle_usecase: Arc<MessageLifecycleUseCase>,
    pub theme_usecase: Arc<ThemeUseCase>,
    /// 受信イベントのディスパッチャー
    pub dispatcher: EventDispatcher,
    pub settings: ChatSettings,
}

impl AppState {
    /// Wire every use case against the given collaborators.
    ///
    /// Fails only when the handler table does not cover every inbound event.
    pub fn new(
        repos: Repositories,
        pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        settings: ChatSettings,
    ) -> Result<Self, DispatcherError> {
        // 1. Registry and emitter
        let registry = Arc::new(ConnectionRegistry::new());
        let emitter = EventEmitter::new(registry.clone(), pusher);

        // 2. UseCases
        let notification_usecase = Arc::new(NotificationUseCase::new(
            repos.notifications.clone(),
            emitter.clone(),
            clock.clone(),
            &settings,
        ));
        let send_message_usecase = Arc::new(SendMessageUseCase::new(
            repos.users.clone(),
            repos.chats.clone(),
            repos.messages.clone(),
            notification_usecase.clone(),
            emitter.clone(),
            clock.clone(),
        ));

        // 3. Dispatcher
        let dispatcher = EventDispatcher::new(handler_table())?;

        Ok(Self {
            connect_client_usecase: Arc::new(ConnectClientUseCase::new(
                repos.users.clone(),
                emitter.clone(),
                clock.clone(),
            )),
            disconnect_client_usecase: Arc::new(DisconnectClientUseCase::new(
                repos.users.clone(),
                emitter.clone(),
                clock.clone(),
            )),
            room_membership_usecase: Arc::new(RoomMembershipUseCase::new(
                registry.clone(),
                repos.chats.clone(),
                settings.verify_join,
            )),
            send_message_usecase,
            typing_usecase: Arc::new(TypingUseCase::new(repos.users.clone(), emitter.clone())),
            read_receipt_usecase: Arc::new(ReadReceiptUseCase::new(
                repos.chats.clone(),
                repos.messages.clone(),
                emitter.clone(),
                clock.clone(),
            )),
            notification_usecase,
            reaction_usecase: Arc::new(ReactionUseCase::new(
                repos.chats.clone(),
                repos.messages.clone(),
                emitter.clone(),
                clock.clone(),
            )),
            presence_query_usecase: Arc::new(PresenceQueryUseCase::new(
                repos.users.clone(),
                repos.chats.clone(),
                emitter.clone(),
            )),
            message_lifecycle_usecase: Arc::new(MessageLifecycleUseCase::new(
                repos.chats.clone(),
                repos.messages.clone(),
                emitter.clone(),
                clock.clone(),
            )),
            theme_usecase: Arc::new(ThemeUseCase::new(repos.chats, emitter.clone(), clock)),
            registry,
            emitter,
            dispatcher,
            settings,
        })
    }
}
