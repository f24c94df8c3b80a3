//! API routes for vigild.
//!
//! Thin mapping from HTTP to the repository, notifier, and answerer.
//! GET list endpoints return bare arrays (what the dashboard consumes);
//! everything else rides in the response envelope.

use crate::answerer::AnswerError;
use crate::notifier::UpdateEvent;
use crate::repository::RepoError;
use crate::server::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{error, info};
use vigil_common::record::{rfc3339, Collection};
use vigil_common::response::ApiResponse;

type AppStateArc = Arc<AppState>;

type ApiError = (StatusCode, Json<ApiResponse>);

// ============================================================================
// Telemetry Routes
// ============================================================================

pub fn telemetry_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/system-metrics", get(recent_metrics).post(create_metric))
        .route("/logs", get(recent_logs).post(create_logs))
        .route(
            "/processes-snapshots",
            get(recent_snapshots).post(create_snapshot),
        )
}

/// Query string for recent-record reads.
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

async fn recent_metrics(
    State(state): State<AppStateArc>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    list_recent(&state, Collection::SystemMetrics, query.limit)
}

async fn recent_logs(
    State(state): State<AppStateArc>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    list_recent(&state, Collection::Logs, query.limit)
}

/// The dashboard asks for the latest snapshot only, so the default limit
/// here is 1 rather than the repository-wide 10.
async fn recent_snapshots(
    State(state): State<AppStateArc>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    list_recent(
        &state,
        Collection::ProcessesSnapshots,
        Some(query.limit.unwrap_or(1)),
    )
}

async fn create_metric(
    State(state): State<AppStateArc>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    create_one(&state, Collection::SystemMetrics, payload)
}

/// Logs accept a single record or a batch; a batch is all-or-nothing.
async fn create_logs(
    State(state): State<AppStateArc>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    match payload {
        Value::Array(values) => {
            let records = state
                .repository
                .insert_many(Collection::Logs, values)
                .map_err(repo_error)?;
            state.notifier.publish(UpdateEvent::NewLogs);

            let data = Value::Array(records.iter().map(|r| r.to_json()).collect());
            Ok((StatusCode::CREATED, Json(ApiResponse::created(data))))
        }
        other => create_one(&state, Collection::Logs, other),
    }
}

async fn create_snapshot(
    State(state): State<AppStateArc>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    create_one(&state, Collection::ProcessesSnapshots, payload)
}

fn list_recent(
    state: &AppState,
    collection: Collection,
    limit: Option<i64>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let records = state
        .repository
        .find_recent(collection, limit)
        .map_err(repo_error)?;
    Ok(Json(records.iter().map(|r| r.to_json()).collect()))
}

fn create_one(
    state: &AppState,
    collection: Collection,
    payload: Value,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    let record = state
        .repository
        .insert_one(collection, payload)
        .map_err(repo_error)?;
    state.notifier.publish(UpdateEvent::for_collection(collection));

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(record.to_json())),
    ))
}

fn repo_error(err: RepoError) -> ApiError {
    match err {
        RepoError::Validation(message) => {
            info!("Rejected write: {}", message);
            (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(400, message)),
            )
        }
        RepoError::Store(e) => {
            error!("Store operation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(500, e.to_string())),
            )
        }
    }
}

// ============================================================================
// Chat Routes
// ============================================================================

/// Request to answer an operator question.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
}

pub fn chat_routes() -> Router<AppStateArc> {
    Router::new().route("/chatbot", post(chatbot))
}

async fn chatbot(
    State(state): State<AppStateArc>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    match state.answerer.answer(&req.prompt).await {
        Ok(answer) => Ok(Json(serde_json::json!({
            "timestamp": rfc3339(Utc::now()),
            "status": 200,
            "answer": answer,
        }))),
        Err(AnswerError::Repository(e)) => Err(repo_error(e)),
        Err(e) => {
            error!("Chatbot request failed: {}", e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ApiResponse::error(502, e.to_string())),
            ))
        }
    }
}

// ============================================================================
// Status Routes
// ============================================================================

pub fn status_routes() -> Router<AppStateArc> {
    Router::new().route("/status", get(status))
}

async fn status(State(state): State<AppStateArc>) -> Json<ApiResponse> {
    Json(ApiResponse::ok().with_data(serde_json::json!({
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    })))
}

// ============================================================================
// Stream Routes
// ============================================================================

pub fn stream_routes() -> Router<AppStateArc> {
    Router::new().route("/events", get(event_stream))
}

/// Live-update stream.
///
/// Each write publishes an SSE event named after its kind. A consumer that
/// lags past the channel window skips the missed events and continues.
async fn event_stream(
    State(state): State<AppStateArc>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.notifier.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let data = serde_json::json!({
                "event": event.as_str(),
                "timestamp": rfc3339(Utc::now()),
            });
            Some(Ok(Event::default().event(event.as_str()).data(data.to_string())))
        }
        Err(_) => None, // lagged consumer skips ahead
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
