//! WebSocket chat server implementation.

pub mod dispatcher;
mod handler;
mod retention;
mod server;
mod signal;
pub mod state; // UseCase 層と結合テストからアクセスするため public

pub use handler::{ApiError, AuthUser, USER_ID_HEADER};
pub use retention::spawn_retention_cleanup;
pub use server::Server;
pub use signal::shutdown_signal;
