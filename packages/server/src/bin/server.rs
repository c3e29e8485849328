//! Hangspace chat server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hangspace-server
//! cargo run --bin hangspace-server -- --host 0.0.0.0 --port 3000 --seed-file seed.json
//! ```

use std::sync::Arc;

use clap::Parser;
use hangspace_server::{
    config::Config,
    domain::{MessagePusher, Repositories},
    infrastructure::{
        message_pusher::WebSocketMessagePusher,
        repository::{InMemoryStore, SeedFixture},
    },
    ui::{Server, state::AppState},
};
use hangspace_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[tokio::main]
async fn main() {
    let config = Config::parse();

    // Initialize tracing
    setup_logger(
        &[env!("CARGO_PKG_NAME"), "hangspace_shared", "tower_http"],
        &config.log_level,
    );

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize dependencies in order:
    // 1. Repository
    // 2. MessagePusher
    // 3. AppState (registry, UseCases, dispatcher)
    // 4. Server

    // 1. Create Repository (in-memory database)
    let store = match &config.seed_file {
        Some(path) => {
            let fixture = SeedFixture::load(path).await?;
            tracing::info!(
                users = fixture.users.len(),
                chats = fixture.chats.len(),
                "Loaded seed fixture from {}",
                path.display()
            );
            InMemoryStore::with_fixture(fixture).await
        }
        None => InMemoryStore::new(),
    };
    let repos = Repositories::from_store(Arc::new(store));

    // 2. Create MessagePusher (WebSocket implementation)
    let pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());

    // 3. Wire UseCases
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(repos, pusher, clock, config.settings())?;

    // 4. Create and run the server
    Server::new(state).run(config.host, config.port).await
}
