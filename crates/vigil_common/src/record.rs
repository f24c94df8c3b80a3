//! Telemetry record model.
//!
//! Records are schema-less JSON documents. Two fields are distinguished:
//! `_id` is assigned by the store and rendered as a string everywhere
//! outside it, and `timestamp` must arrive as a parseable ISO-8601 string
//! and is held as an instant internally. Every other field is carried
//! through untouched.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Field name of the client-supplied record instant.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Field name of the store-assigned identifier in rendered records.
pub const ID_FIELD: &str = "_id";

/// The three telemetry collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    SystemMetrics,
    Logs,
    ProcessesSnapshots,
}

impl Collection {
    /// Table name in the document store.
    pub fn table(&self) -> &'static str {
        match self {
            Collection::SystemMetrics => "system_metrics",
            Collection::Logs => "logs",
            Collection::ProcessesSnapshots => "processes_snapshots",
        }
    }

    pub const ALL: [Collection; 3] = [
        Collection::SystemMetrics,
        Collection::Logs,
        Collection::ProcessesSnapshots,
    ];
}

/// Validation errors for incoming records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("record must be a JSON object")]
    NotAnObject,

    #[error("missing required field 'timestamp'")]
    MissingTimestamp,

    #[error("timestamp {0} is not a parseable ISO-8601 string")]
    BadTimestamp(String),
}

/// A validated record ready for insertion: the parsed instant plus the
/// remaining client-supplied fields.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub timestamp: DateTime<Utc>,
    pub fields: Map<String, Value>,
}

impl NewRecord {
    /// Validate an incoming JSON value.
    ///
    /// The `timestamp` field must be present and an ISO-8601 string; it is
    /// removed from the field map and parsed to an instant. A naive
    /// datetime (no offset) is taken as UTC.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let mut fields = match value {
            Value::Object(map) => map,
            _ => return Err(RecordError::NotAnObject),
        };

        let raw = fields
            .remove(TIMESTAMP_FIELD)
            .ok_or(RecordError::MissingTimestamp)?;
        let raw = match raw.as_str() {
            Some(s) => s.to_string(),
            None => return Err(RecordError::BadTimestamp(raw.to_string())),
        };

        let timestamp = parse_timestamp(&raw).ok_or(RecordError::BadTimestamp(raw))?;

        Ok(Self { timestamp, fields })
    }
}

/// A record as materialized by the store: assigned id, instant, and the
/// remaining fields.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub fields: Map<String, Value>,
}

impl StoredRecord {
    /// Render for the outside world: string `_id`, ISO-8601 `timestamp`,
    /// client fields carried through. Store-native types never leave the
    /// repository boundary in any other form.
    pub fn to_json(&self) -> Value {
        let mut out = self.fields.clone();
        out.insert(ID_FIELD.to_string(), Value::String(self.id.to_string()));
        out.insert(
            TIMESTAMP_FIELD.to_string(),
            Value::String(rfc3339(self.timestamp)),
        );
        Value::Object(out)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Python's datetime.isoformat() omits the offset for naive datetimes
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// RFC 3339 rendering with millisecond precision and the `Z` designator.
pub fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
