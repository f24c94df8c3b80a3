//! HTTP server for vigild.

use crate::answerer::Answerer;
use crate::notifier::UpdateNotifier;
use crate::repository::TelemetryRepository;
use crate::routes;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers.
///
/// Explicitly constructed and injected — no process-wide singletons, so
/// tests build isolated instances.
pub struct AppState {
    pub repository: TelemetryRepository,
    pub notifier: UpdateNotifier,
    pub answerer: Answerer,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        repository: TelemetryRepository,
        notifier: UpdateNotifier,
        answerer: Answerer,
    ) -> Self {
        Self {
            repository,
            notifier,
            answerer,
            start_time: Instant::now(),
        }
    }
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::telemetry_routes())
        .merge(routes::chat_routes())
        .merge(routes::status_routes())
        .merge(routes::stream_routes())
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server.
pub async fn run(state: AppState, bind_addr: &str) -> Result<()> {
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("  Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
