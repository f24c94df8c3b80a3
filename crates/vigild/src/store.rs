//! SQLite-backed document store.
//!
//! One table per telemetry collection. The store assigns ids
//! (AUTOINCREMENT, so insertion order and id order coincide) and keeps the
//! record instant in a dedicated indexed column for window queries; the
//! rest of the record rides as a serialized JSON document.

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use vigil_common::record::Collection;

/// Default database path.
pub const DB_PATH: &str = "/var/lib/vigil/telemetry.db";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt document in store: {0}")]
    Corrupt(String),
}

/// A row as persisted: assigned id, instant in unix milliseconds, and the
/// serialized field map.
#[derive(Debug, Clone)]
pub struct StoredRow {
    pub id: i64,
    pub timestamp_ms: i64,
    pub doc: String,
}

/// Document store over a single SQLite database.
pub struct DocumentStore {
    conn: Mutex<Connection>,
}

impl DocumentStore {
    /// Open or create the store at the default path.
    pub fn open() -> Result<Self, StoreError> {
        Self::open_at(DB_PATH)
    }

    /// Open at a specific path.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        // WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        Self::init(conn)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS system_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                doc TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_system_metrics_timestamp
                ON system_metrics(timestamp);

            CREATE TABLE IF NOT EXISTS logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                doc TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_logs_timestamp
                ON logs(timestamp);

            CREATE TABLE IF NOT EXISTS processes_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                doc TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_processes_snapshots_timestamp
                ON processes_snapshots(timestamp);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert one document, returning the assigned id.
    pub fn insert(
        &self,
        collection: Collection,
        timestamp_ms: i64,
        doc: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (timestamp, doc) VALUES (?1, ?2)",
                collection.table()
            ),
            params![timestamp_ms, doc],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a batch in one transaction; either every document lands or
    /// none do. Returns the assigned ids in input order.
    pub fn insert_batch(
        &self,
        collection: Collection,
        rows: &[(i64, String)],
    ) -> Result<Vec<i64>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(rows.len());
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (timestamp, doc) VALUES (?1, ?2)",
                collection.table()
            ))?;

            for (timestamp_ms, doc) in rows {
                stmt.execute(params![timestamp_ms, doc])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    /// The `limit` most recent rows, descending by id.
    pub fn recent_desc(
        &self,
        collection: Collection,
        limit: i64,
    ) -> Result<Vec<StoredRow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, timestamp, doc FROM {} ORDER BY id DESC LIMIT ?1",
            collection.table()
        ))?;

        let rows = stmt.query_map(params![limit], |row| {
            Ok(StoredRow {
                id: row.get(0)?,
                timestamp_ms: row.get(1)?,
                doc: row.get(2)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// All rows with `timestamp >= cutoff`, ascending by id.
    pub fn since(
        &self,
        collection: Collection,
        cutoff_ms: i64,
    ) -> Result<Vec<StoredRow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, timestamp, doc FROM {} WHERE timestamp >= ?1 ORDER BY id ASC",
            collection.table()
        ))?;

        let rows = stmt.query_map(params![cutoff_ms], |row| {
            Ok(StoredRow {
                id: row.get(0)?,
                timestamp_ms: row.get(1)?,
                doc: row.get(2)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Row count for a collection.
    pub fn count(&self, collection: Collection) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", collection.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> DocumentStore {
        DocumentStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let store = test_store();

        let first = store
            .insert(Collection::SystemMetrics, 1000, r#"{"cpu":1}"#)
            .unwrap();
        let second = store
            .insert(Collection::SystemMetrics, 2000, r#"{"cpu":2}"#)
            .unwrap();

        assert!(second > first);
    }

    #[test]
    fn test_recent_desc_order_and_limit() {
        let store = test_store();
        for i in 0..5 {
            store
                .insert(Collection::Logs, 1000 + i, &format!(r#"{{"n":{}}}"#, i))
                .unwrap();
        }

        let rows = store.recent_desc(Collection::Logs, 3).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].id > rows[1].id);
        assert!(rows[1].id > rows[2].id);
    }

    #[test]
    fn test_since_filters_on_timestamp() {
        let store = test_store();
        store.insert(Collection::Logs, 1000, r#"{"old":true}"#).unwrap();
        store.insert(Collection::Logs, 5000, r#"{"new":true}"#).unwrap();

        let rows = store.since(Collection::Logs, 2000).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp_ms, 5000);
    }

    #[test]
    fn test_batch_insert_returns_ids_in_order() {
        let store = test_store();
        let rows = vec![
            (1000, r#"{"n":1}"#.to_string()),
            (2000, r#"{"n":2}"#.to_string()),
            (3000, r#"{"n":3}"#.to_string()),
        ];

        let ids = store.insert_batch(Collection::Logs, &rows).unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids[0] < ids[1] && ids[1] < ids[2]);
        assert_eq!(store.count(Collection::Logs).unwrap(), 3);
    }

    #[test]
    fn test_collections_are_independent() {
        let store = test_store();
        store
            .insert(Collection::SystemMetrics, 1000, r#"{"cpu":1}"#)
            .unwrap();

        assert_eq!(store.count(Collection::SystemMetrics).unwrap(), 1);
        assert_eq!(store.count(Collection::Logs).unwrap(), 0);
        assert_eq!(store.count(Collection::ProcessesSnapshots).unwrap(), 0);
    }
}
