//! libSQL backend — async `RecordStore` implementation.
//!
//! One table per destination, structurally identical: the trimmed subject
//! in its own column for the case-insensitive lookup, the full merged
//! record as a JSON text column.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::pipeline::routing::Destination;
use crate::store::traits::RecordStore;

/// libSQL record store.
///
/// Holds a single connection reused for all operations;
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and initialize the schema.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Record store opened");
        Ok(store)
    }

    /// Create an in-memory store (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Pool(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create both destination tables if they don't exist yet.
    async fn init_schema(&self) -> Result<(), StoreError> {
        for destination in Destination::ALL {
            self.conn
                .execute(
                    &format!(
                        "CREATE TABLE IF NOT EXISTS {} (
                            id TEXT PRIMARY KEY,
                            subject TEXT NOT NULL,
                            record TEXT NOT NULL,
                            created_at TEXT NOT NULL
                        )",
                        destination.table()
                    ),
                    (),
                )
                .await
                .map_err(|e| StoreError::Query(format!("init_schema: {e}")))?;
        }
        Ok(())
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl RecordStore for LibSqlStore {
    async fn subject_exists(
        &self,
        destination: Destination,
        subject: &str,
    ) -> Result<bool, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE LOWER(subject) = LOWER(?1)",
                    destination.table()
                ),
                params![subject],
            )
            .await
            .map_err(|e| StoreError::Query(format!("subject_exists: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row.get(0).unwrap_or(0);
                Ok(count > 0)
            }
            Ok(None) => Ok(false),
            Err(e) => Err(StoreError::Query(format!("subject_exists: {e}"))),
        }
    }

    async fn insert(
        &self,
        destination: Destination,
        subject: &str,
        record: &Map<String, Value>,
    ) -> Result<(), StoreError> {
        let id = Uuid::new_v4().to_string();
        let record_json = serde_json::to_string(&Value::Object(record.clone()))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                &format!(
                    "INSERT INTO {} (id, subject, record, created_at) VALUES (?1, ?2, ?3, ?4)",
                    destination.table()
                ),
                params![id.clone(), subject, record_json, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("insert: {e}")))?;

        debug!(id = %id, collection = destination.collection(), "Record inserted");
        Ok(())
    }
}
