//! Vigil Daemon - server telemetry dashboard backend.
//!
//! Stores telemetry pushed by agents, fans out live-update events to
//! connected clients, and answers operator questions over recent
//! telemetry via a completion provider.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, Level};
use vigil_common::llm_client::HttpCompletionClient;
use vigild::answerer::Answerer;
use vigild::config::Config;
use vigild::notifier::UpdateNotifier;
use vigild::repository::TelemetryRepository;
use vigild::server::{self, AppState};
use vigild::store::DocumentStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("vigild v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load();

    if let Some(parent) = Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = Arc::new(DocumentStore::open_at(&config.database.path)?);
    let repository = TelemetryRepository::new(store);
    info!("Document store ready at {}", config.database.path);

    let notifier = UpdateNotifier::new();
    let client = Arc::new(HttpCompletionClient::new(config.llm.clone())?);
    let answerer = Answerer::new(
        repository.clone(),
        client,
        config.summarize.lookback_secs,
    );

    let state = AppState::new(repository, notifier, answerer);
    server::run(state, &config.server.bind_addr).await
}
