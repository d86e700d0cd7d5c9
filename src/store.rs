//! Document store sink.
//!
//! Records land in a single collection, one document per successfully decoded
//! datagram. The SQLite backend keeps each document as a JSON text column so
//! no schema is imposed on the form fields.

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use serde_json::{Map, Value};

use crate::form::Fields;

/// Collection every record is inserted into.
pub const COLLECTION: &str = "messages";

/// Name of the synthetic timestamp field.
pub const DATE_FIELD: &str = "date";

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("encode document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One persisted form submission.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub fields: Fields,
    pub date: DateTime<Utc>,
}

impl Record {
    /// Stamps `fields` with the current wall-clock time.
    pub fn now(fields: Fields) -> Self {
        Self { fields, date: Utc::now() }
    }

    /// The document as written to the store. A submitted `date` field is
    /// replaced by the timestamp.
    pub fn to_document(&self) -> Value {
        let mut doc: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        doc.insert(
            DATE_FIELD.to_owned(),
            Value::String(self.date.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
        Value::Object(doc)
    }
}

/// A sink that accepts one record per call.
///
/// Each call stands alone: a failed insert must leave the store usable for
/// the next one.
pub trait DocumentStore: Send + Sync + 'static {
    fn insert(&self, record: Record) -> impl Future<Output = Result<(), StoreError>> + Send;
}

// ── SQLite ────────────────────────────────────────────────────────────────────

/// SQLite-backed document store.
///
/// The connection string is a database path. A connection is opened for each
/// insert and closed when it drops, so a broken insert never poisons a
/// long-lived handle.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    uri: Arc<str>,
}

impl SqliteStore {
    pub fn new(uri: impl Into<Arc<str>>) -> Self {
        Self { uri: uri.into() }
    }

    /// Reads back every stored document in insertion order.
    pub async fn all(&self) -> Result<Vec<Value>, StoreError> {
        let uri = Arc::clone(&self.uri);
        tokio::task::spawn_blocking(move || -> Result<Vec<Value>, StoreError> {
            let conn = open(&uri)?;
            let mut stmt =
                conn.prepare(&format!("SELECT document FROM {COLLECTION} ORDER BY id"))?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

            let mut docs: Vec<Value> = Vec::new();
            for row in rows {
                docs.push(serde_json::from_str(&row?)?);
            }
            Ok(docs)
        })
        .await?
    }
}

impl DocumentStore for SqliteStore {
    async fn insert(&self, record: Record) -> Result<(), StoreError> {
        let uri = Arc::clone(&self.uri);
        let document = serde_json::to_string(&record.to_document())?;
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = open(&uri)?;
            conn.execute(
                &format!("INSERT INTO {COLLECTION} (document) VALUES (?1)"),
                params![document],
            )?;
            Ok(())
        })
        .await?
    }
}

fn open(uri: &str) -> Result<Connection, StoreError> {
    let conn = Connection::open(Path::new(uri))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {COLLECTION} (
             id       INTEGER PRIMARY KEY AUTOINCREMENT,
             document TEXT NOT NULL
         )"
    ))?;
    Ok(conn)
}

// ── In-memory ─────────────────────────────────────────────────────────────────

/// Keeps records in process memory. Useful for tests and dry runs.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything inserted so far.
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl DocumentStore for MemoryStore {
    async fn insert(&self, record: Record) -> Result<(), StoreError> {
        self.records
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .push(record);
        Ok(())
    }
}
