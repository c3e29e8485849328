//! Command line and environment configuration.

use std::path::PathBuf;

use clap::Parser;

use crate::usecase::ChatSettings;

/// Hangspace real-time chat server
#[derive(Parser, Debug, Clone)]
#[command(name = "hangspace-server", version)]
#[command(about = "Real-time chat fan-out and notification server", long_about = None)]
pub struct Config {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HANGSPACE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "HANGSPACE_PORT", default_value = "8080")]
    pub port: u16,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, env = "HANGSPACE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// JSON fixture with users and chats loaded at startup
    #[arg(long, env = "HANGSPACE_SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    /// Maximum characters of message preview in notification summaries
    #[arg(long, env = "HANGSPACE_PREVIEW_CHARS", default_value_t = 50)]
    pub preview_chars: usize,

    /// Number of notifications returned by `request_notifications`
    #[arg(long, env = "HANGSPACE_NOTIFICATION_PAGE_SIZE", default_value_t = 10)]
    pub notification_page_size: usize,

    /// Days to keep read notifications before the cleanup task removes them
    #[arg(long, env = "HANGSPACE_NOTIFICATION_RETENTION_DAYS", default_value_t = 30)]
    pub retention_days: u32,

    /// Interval in seconds between retention cleanup runs
    #[arg(long, env = "HANGSPACE_CLEANUP_INTERVAL_SECS", default_value_t = 3600)]
    pub cleanup_interval_secs: u64,

    /// Require chat membership for `join_chat`
    #[arg(long, env = "HANGSPACE_VERIFY_JOIN")]
    pub verify_join: bool,
}

impl Config {
    pub fn settings(&self) -> ChatSettings {
        ChatSettings {
            preview_chars: self.preview_chars,
            notification_page_size: self.notification_page_size,
            retention_days: self.retention_days,
            cleanup_interval_secs: self.cleanup_interval_secs,
            verify_join: self.verify_join,
        }
    }
}
