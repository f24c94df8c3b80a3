//! HTTP response envelope.
//!
//! The envelope `timestamp` is the moment the response was generated. A
//! stored record keeps its own `timestamp` under `data` — the two are
//! never conflated.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::rfc3339;

/// Response wrapper for non-list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Response-generation time, ISO-8601.
    pub timestamp: String,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            timestamp: rfc3339(Utc::now()),
            status: 200,
            message: "OK".to_string(),
            data: None,
            error: None,
        }
    }

    pub fn created(data: Value) -> Self {
        Self {
            timestamp: rfc3339(Utc::now()),
            status: 201,
            message: "Created".to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(status: u16, detail: impl Into<String>) -> Self {
        Self {
            timestamp: rfc3339(Utc::now()),
            status,
            message: "Error".to_string(),
            data: None,
            error: Some(detail.into()),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}
