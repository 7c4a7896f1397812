//! `RecordStore` trait — the pipeline's view of the record store.
//!
//! Two named destinations, each supporting a case-insensitive subject
//! lookup and a single-record insert. No updates or deletes — records are
//! created once and never touched again by this pipeline.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::pipeline::routing::Destination;

/// Backend-agnostic record store covering both destinations.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Whether a record with this subject (case-insensitive exact match)
    /// already exists in `destination`.
    async fn subject_exists(
        &self,
        destination: Destination,
        subject: &str,
    ) -> Result<bool, StoreError>;

    /// Insert one merged record into `destination`.
    ///
    /// `subject` is the trimmed dedupe subject; the full record is stored
    /// alongside it verbatim.
    async fn insert(
        &self,
        destination: Destination,
        subject: &str,
        record: &Map<String, Value>,
    ) -> Result<(), StoreError>;
}
