//! Telemetry repository.
//!
//! Typed read/write operations over the document store: timestamp
//! validation on the way in, id stringification and ordering rules on the
//! way out. The store's native types never reach callers.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use vigil_common::record::{Collection, NewRecord, RecordError, StoredRecord};

use crate::store::{DocumentStore, StoreError, StoredRow};

/// Default number of records returned by a recent-query.
pub const DEFAULT_RECENT_LIMIT: i64 = 10;

#[derive(Debug, Error)]
pub enum RepoError {
    /// Client-supplied record failed validation; nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RecordError> for RepoError {
    fn from(err: RecordError) -> Self {
        RepoError::Validation(err.to_string())
    }
}

/// Shared handle to the telemetry collections.
#[derive(Clone)]
pub struct TelemetryRepository {
    store: Arc<DocumentStore>,
}

impl TelemetryRepository {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Validate and persist a single record, returning it fully
    /// materialized with the assigned id.
    pub fn insert_one(
        &self,
        collection: Collection,
        value: Value,
    ) -> Result<StoredRecord, RepoError> {
        let record = NewRecord::from_value(value)?;

        let doc = Value::Object(record.fields.clone()).to_string();
        let id = self
            .store
            .insert(collection, record.timestamp.timestamp_millis(), &doc)?;

        debug!("Inserted {} record id={}", collection.table(), id);
        Ok(StoredRecord {
            id,
            timestamp: record.timestamp,
            fields: record.fields,
        })
    }

    /// Validate every record, then insert the whole batch atomically.
    ///
    /// Any invalid record rejects the batch, naming its index; nothing is
    /// inserted in that case.
    pub fn insert_many(
        &self,
        collection: Collection,
        values: Vec<Value>,
    ) -> Result<Vec<StoredRecord>, RepoError> {
        let mut parsed = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            let record = NewRecord::from_value(value)
                .map_err(|e| RepoError::Validation(format!("record {}: {}", index, e)))?;
            parsed.push(record);
        }

        let rows: Vec<(i64, String)> = parsed
            .iter()
            .map(|record| {
                (
                    record.timestamp.timestamp_millis(),
                    Value::Object(record.fields.clone()).to_string(),
                )
            })
            .collect();

        let ids = self.store.insert_batch(collection, &rows)?;
        debug!(
            "Inserted batch of {} into {}",
            ids.len(),
            collection.table()
        );

        Ok(parsed
            .into_iter()
            .zip(ids)
            .map(|(record, id)| StoredRecord {
                id,
                timestamp: record.timestamp,
                fields: record.fields,
            })
            .collect())
    }

    /// The `limit` most recently inserted records, re-ordered ascending by
    /// id. Defaults to [`DEFAULT_RECENT_LIMIT`]; `limit <= 0` yields an
    /// empty result, not an error.
    pub fn find_recent(
        &self,
        collection: Collection,
        limit: Option<i64>,
    ) -> Result<Vec<StoredRecord>, RepoError> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let mut rows = self.store.recent_desc(collection, limit)?;
        rows.reverse();
        rows.into_iter().map(materialize).collect()
    }

    /// The single most recent processes snapshot, if any.
    pub fn find_latest_snapshot(&self) -> Result<Option<StoredRecord>, RepoError> {
        Ok(self
            .find_recent(Collection::ProcessesSnapshots, Some(1))?
            .pop())
    }

    /// All records whose timestamp falls within the trailing `window`,
    /// ascending by id.
    pub fn find_since(
        &self,
        collection: Collection,
        window: Duration,
    ) -> Result<Vec<StoredRecord>, RepoError> {
        let cutoff = (Utc::now() - window).timestamp_millis();
        self.store
            .since(collection, cutoff)?
            .into_iter()
            .map(materialize)
            .collect()
    }
}

fn materialize(row: StoredRow) -> Result<StoredRecord, RepoError> {
    let fields: Map<String, Value> = serde_json::from_str(&row.doc)
        .map_err(|e| StoreError::Corrupt(format!("record {}: {}", row.id, e)))?;

    let timestamp = DateTime::<Utc>::from_timestamp_millis(row.timestamp_ms).ok_or_else(|| {
        StoreError::Corrupt(format!(
            "record {}: timestamp {} out of range",
            row.id, row.timestamp_ms
        ))
    })?;

    Ok(StoredRecord {
        id: row.id,
        timestamp,
        fields,
    })
}
