//! End-to-end tests over the HTTP surface.
//!
//! Each test builds an isolated app with an in-memory store and a faked
//! completion provider, then drives it through the router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use vigil_common::llm_client::{CompletionError, FakeCompletionClient};
use vigild::answerer::Answerer;
use vigild::notifier::UpdateNotifier;
use vigild::repository::TelemetryRepository;
use vigild::server::{app, AppState};
use vigild::store::DocumentStore;

fn test_app_with_client(client: Arc<FakeCompletionClient>) -> Router {
    let store = Arc::new(DocumentStore::open_in_memory().unwrap());
    let repository = TelemetryRepository::new(store);
    let notifier = UpdateNotifier::new();
    let answerer = Answerer::new(repository.clone(), client, 60);
    app(AppState::new(repository, notifier, answerer))
}

fn test_app() -> Router {
    test_app_with_client(Arc::new(FakeCompletionClient::always_text("ok")))
}

async fn send(app: Router, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_post_metric_then_get_recent() {
    let app = test_app();

    let (status, body) = send(
        app.clone(),
        "POST",
        "/system-metrics",
        Some(json!({"timestamp": "2024-01-01T00:00:00Z", "cpu": 42})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], json!(201));

    // The envelope timestamp is the response moment, not the metric's own
    let envelope_ts = body["timestamp"].as_str().unwrap();
    let entity_ts = body["data"]["timestamp"].as_str().unwrap();
    assert_eq!(entity_ts, "2024-01-01T00:00:00.000Z");
    assert_ne!(envelope_ts, entity_ts);

    let id = body["data"]["_id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());

    let (status, listed) = send(app, "GET", "/system-metrics?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["cpu"], json!(42));
    assert_eq!(listed[0]["_id"], json!(id));
}

#[tokio::test]
async fn test_post_metric_without_timestamp_is_rejected() {
    let app = test_app();

    let (status, body) = send(
        app.clone(),
        "POST",
        "/system-metrics",
        Some(json!({"cpu": 42})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("timestamp"));

    let (_, listed) = send(app, "GET", "/system-metrics", None).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_post_metric_with_bad_timestamp_is_rejected() {
    let app = test_app();

    let (status, _) = send(
        app,
        "POST",
        "/system-metrics",
        Some(json!({"timestamp": "not-a-time", "cpu": 42})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_log_batch_is_all_or_nothing() {
    let app = test_app();

    let (status, body) = send(
        app.clone(),
        "POST",
        "/logs",
        Some(json!([
            {"timestamp": "2024-01-01T00:00:00Z", "message": "ok"},
            {"message": "missing clock"},
        ])),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("record 1"));

    let (_, listed) = send(app, "GET", "/logs", None).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_log_batch_inserts_all() {
    let app = test_app();

    let (status, body) = send(
        app.clone(),
        "POST",
        "/logs",
        Some(json!([
            {"timestamp": "2024-01-01T00:00:00Z", "message": "one"},
            {"timestamp": "2024-01-01T00:00:01Z", "message": "two"},
        ])),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);

    let (_, listed) = send(app, "GET", "/logs", None).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["message"], json!("one"));
    assert_eq!(listed[1]["message"], json!("two"));
}

#[tokio::test]
async fn test_single_log_object_accepted() {
    let app = test_app();

    let (status, body) = send(
        app,
        "POST",
        "/logs",
        Some(json!({"timestamp": "2024-01-01T00:00:00Z", "message": "solo"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["message"], json!("solo"));
}

#[tokio::test]
async fn test_processes_snapshot_defaults_to_latest() {
    let app = test_app();

    for pid in [1, 2] {
        let (status, _) = send(
            app.clone(),
            "POST",
            "/processes-snapshots",
            Some(json!({
                "timestamp": "2024-01-01T00:00:00Z",
                "processes": [{"pid": pid, "name": "init"}],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, listed) = send(app, "GET", "/processes-snapshots", None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["processes"][0]["pid"], json!(2));
}

#[tokio::test]
async fn test_get_with_limit_zero_is_empty() {
    let app = test_app();

    send(
        app.clone(),
        "POST",
        "/system-metrics",
        Some(json!({"timestamp": "2024-01-01T00:00:00Z", "cpu": 1})),
    )
    .await;

    let (status, listed) = send(app, "GET", "/system-metrics?limit=0", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_chatbot_returns_answer() {
    let app = test_app_with_client(Arc::new(FakeCompletionClient::always_text("answer")));

    let (status, body) = send(
        app,
        "POST",
        "/chatbot",
        Some(json!({"prompt": "how is the server?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], json!("answer"));
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_chatbot_provider_failure_is_bad_gateway() {
    let app = test_app_with_client(Arc::new(FakeCompletionClient::always_error(
        CompletionError::Http("quota exceeded".to_string()),
    )));

    let (status, body) = send(app, "POST", "/chatbot", Some(json!({"prompt": "hi"}))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn test_status_reports_ok() {
    let (status, body) = send(test_app(), "GET", "/status", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!(200));
    assert_eq!(body["message"], json!("OK"));
    assert!(body["timestamp"].as_str().is_some());
    assert!(body["data"]["uptime_seconds"].is_u64());
}
