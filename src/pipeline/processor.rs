//! Intake processor — runs each record through dedupe, extraction,
//! classification, persistence, and audit emission.
//!
//! Flow per item:
//! 1. Duplicate filter — subject lookup in both destinations (read-only)
//! 2. Extraction — one call to the extraction service, no retry
//! 3. Merge — extracted fields overlay the original record
//! 4. Classify + write — subject rule picks the destination
//! 5. Audit — exactly one entry per item, best effort
//!
//! Items are independent; a failure is converted into the item's outcome
//! and the batch continues. Only the success-path audit emission can change
//! a status: write succeeded but the entry didn't land → `warning`.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::audit::{AuditEntry, AuditSink};
use crate::error::StoreError;
use crate::extract::Extractor;
use crate::pipeline::routing::{Destination, route};
use crate::pipeline::types::{InboundRecord, ItemOutcome, ItemStatus, merged_record};
use crate::store::RecordStore;

/// Intake processor — the core of the service.
pub struct IntakeProcessor {
    store: Arc<dyn RecordStore>,
    extractor: Arc<dyn Extractor>,
    audit: Arc<dyn AuditSink>,
}

impl IntakeProcessor {
    /// Create a new processor over its three collaborators.
    pub fn new(
        store: Arc<dyn RecordStore>,
        extractor: Arc<dyn Extractor>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            extractor,
            audit,
        }
    }

    /// Process a batch of records strictly in order.
    ///
    /// Every record yields an outcome; failures never abort the batch.
    pub async fn process_batch(&self, records: Vec<InboundRecord>) -> Vec<ItemOutcome> {
        let count = records.len();
        info!(count, "Processing batch");

        let mut outcomes = Vec::with_capacity(count);
        for record in records {
            outcomes.push(self.process(record).await);
        }

        let errors = outcomes
            .iter()
            .filter(|o| o.status == ItemStatus::Error)
            .count();
        info!(total = count, errors, "Batch complete");
        outcomes
    }

    /// Process a single record through the full pipeline.
    pub async fn process(&self, record: InboundRecord) -> ItemOutcome {
        let subject = record.dedupe_subject().to_string();
        info!(id = ?record.id, subject = %subject, "Processing record");

        // Step 1: duplicate filter
        match self.find_duplicate(&subject).await {
            Ok(Some(destination)) => {
                debug!(subject = %subject, collection = destination.collection(), "Duplicate subject, skipping");
                let reason = format!(
                    "subject already processed in {}",
                    destination.collection()
                );
                self.emit_best_effort(AuditEntry::skip(&subject, reason.clone()))
                    .await;
                return ItemOutcome {
                    id: record.id,
                    status: ItemStatus::Skipped,
                    message: Some(reason),
                    collection: None,
                    error: None,
                };
            }
            Ok(None) => {}
            Err(e) => {
                error!(subject = %subject, error = %e, "Duplicate lookup failed");
                let detail = format!("duplicate lookup failed: {e}");
                self.emit_best_effort(AuditEntry::error(&subject, detail.clone()))
                    .await;
                return ItemOutcome {
                    id: record.id,
                    status: ItemStatus::Error,
                    message: None,
                    collection: None,
                    error: Some(detail),
                };
            }
        }

        // Step 2: extraction
        let extracted = match self.extractor.extract(&record.body).await {
            Ok(fields) => fields,
            Err(e) => {
                error!(id = ?record.id, subject = %subject, error = %e, "Extraction failed");
                let detail = e.to_string();
                self.emit_best_effort(AuditEntry::error(&subject, detail.clone()))
                    .await;
                return ItemOutcome {
                    id: record.id,
                    status: ItemStatus::Error,
                    message: None,
                    collection: None,
                    error: Some(detail),
                };
            }
        };

        // Steps 3 + 4: merge, classify, write
        let merged = merged_record(&record, &extracted);
        let destination = route(&subject);

        if let Err(e) = self.store.insert(destination, &subject, &merged).await {
            error!(
                id = ?record.id,
                collection = destination.collection(),
                error = %e,
                "Record write failed"
            );
            let detail = e.to_string();
            self.emit_best_effort(AuditEntry::error(&subject, detail.clone()))
                .await;
            return ItemOutcome {
                id: record.id,
                status: ItemStatus::Error,
                message: None,
                collection: Some(destination.collection().to_string()),
                error: Some(detail),
            };
        }

        info!(
            id = ?record.id,
            collection = destination.collection(),
            "Record stored"
        );

        // Step 5: audit. The write outcome is already decided — a failed
        // emission downgrades the item to `warning`, nothing more.
        let entry = AuditEntry::info(&subject, destination.collection(), "record stored");
        match self.audit.emit(&entry).await {
            Ok(()) => ItemOutcome {
                id: record.id,
                status: ItemStatus::Success,
                message: Some("stored".into()),
                collection: Some(destination.collection().to_string()),
                error: None,
            },
            Err(e) => {
                warn!(subject = %subject, error = %e, "Audit emission failed after write");
                ItemOutcome {
                    id: record.id,
                    status: ItemStatus::Warning,
                    message: Some(format!("stored, but audit emission failed: {e}")),
                    collection: Some(destination.collection().to_string()),
                    error: None,
                }
            }
        }
    }

    /// Look the subject up in both destinations, sequentially.
    ///
    /// Returns the destination that already holds it, if any. No lock is
    /// taken — two concurrent submissions with the same subject can both
    /// see `None` here.
    async fn find_duplicate(&self, subject: &str) -> Result<Option<Destination>, StoreError> {
        for destination in Destination::ALL {
            if self.store.subject_exists(destination, subject).await? {
                return Ok(Some(destination));
            }
        }
        Ok(None)
    }

    /// Emit an audit entry, swallowing failures.
    ///
    /// Used on the skip/error paths where the item's status is already
    /// decided and must not change.
    async fn emit_best_effort(&self, entry: AuditEntry) {
        if let Err(e) = self.audit.emit(&entry).await {
            warn!(reference = %entry.reference, error = %e, "Audit emission failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use serde_json::{Map, Value, json};

    use crate::audit::LogType;
    use crate::error::{AuditError, ExtractError};

    // ── Mock collaborators ──────────────────────────────────────────

    /// In-memory record store mirroring the backend's case-insensitive lookup.
    #[derive(Default)]
    struct MemStore {
        tasks: Mutex<Vec<(String, Map<String, Value>)>>,
        replies: Mutex<Vec<(String, Map<String, Value>)>>,
        fail_inserts: bool,
    }

    impl MemStore {
        fn rows(&self, destination: Destination) -> &Mutex<Vec<(String, Map<String, Value>)>> {
            match destination {
                Destination::Tasks => &self.tasks,
                Destination::Replies => &self.replies,
            }
        }

        fn count(&self, destination: Destination) -> usize {
            self.rows(destination).lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl RecordStore for MemStore {
        async fn subject_exists(
            &self,
            destination: Destination,
            subject: &str,
        ) -> Result<bool, StoreError> {
            let probe = subject.to_lowercase();
            Ok(self
                .rows(destination)
                .lock()
                .unwrap()
                .iter()
                .any(|(stored, _)| stored.to_lowercase() == probe))
        }

        async fn insert(
            &self,
            destination: Destination,
            subject: &str,
            record: &Map<String, Value>,
        ) -> Result<(), StoreError> {
            if self.fail_inserts {
                return Err(StoreError::Query("insert: disk full".into()));
            }
            self.rows(destination)
                .lock()
                .unwrap()
                .push((subject.to_string(), record.clone()));
            Ok(())
        }
    }

    /// Stub extractor — fails for bodies containing "boom", otherwise
    /// returns a fixed field set.
    struct StubExtractor {
        fields: Map<String, Value>,
    }

    impl StubExtractor {
        fn with(fields: Value) -> Self {
            match fields {
                Value::Object(map) => Self { fields: map },
                _ => panic!("stub fields must be an object"),
            }
        }
    }

    #[async_trait::async_trait]
    impl Extractor for StubExtractor {
        async fn extract(&self, body: &str) -> Result<Map<String, Value>, ExtractError> {
            if body.contains("boom") {
                return Err(ExtractError::InvalidResponse {
                    reason: "response is not valid JSON".into(),
                });
            }
            Ok(self.fields.clone())
        }
    }

    /// Recording audit sink, optionally failing every emission.
    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<AuditEntry>>,
        fail: bool,
    }

    impl RecordingSink {
        fn entries(&self) -> Vec<AuditEntry> {
            self.entries.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl AuditSink for RecordingSink {
        async fn emit(&self, entry: &AuditEntry) -> Result<(), AuditError> {
            self.entries.lock().unwrap().push(entry.clone());
            if self.fail {
                return Err(AuditError::UpstreamStatus { status: 503 });
            }
            Ok(())
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn record(id: &str, subject: &str, body: &str) -> InboundRecord {
        serde_json::from_value(json!({"id": id, "subject": subject, "body": body})).unwrap()
    }

    fn processor(
        store: Arc<MemStore>,
        sink: Arc<RecordingSink>,
        fields: Value,
    ) -> IntakeProcessor {
        IntakeProcessor::new(store, Arc::new(StubExtractor::with(fields)), sink)
    }

    // ── Dedupe ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn second_submission_with_same_subject_is_skipped() {
        let store = Arc::new(MemStore::default());
        let sink = Arc::new(RecordingSink::default());
        let p = processor(Arc::clone(&store), Arc::clone(&sink), json!({}));

        let first = p
            .process(record("1", "Interview Support for Jane", "body"))
            .await;
        assert_eq!(first.status, ItemStatus::Success);

        // Case change and whitespace padding must not defeat the filter.
        let second = p
            .process(record("2", "  INTERVIEW SUPPORT FOR JANE ", "body"))
            .await;
        assert_eq!(second.status, ItemStatus::Skipped);
        assert_eq!(store.count(Destination::Tasks), 1);
    }

    #[tokio::test]
    async fn skip_emits_one_skip_entry_with_subject_in_reference() {
        let store = Arc::new(MemStore::default());
        let sink = Arc::new(RecordingSink::default());
        let p = processor(Arc::clone(&store), Arc::clone(&sink), json!({}));

        p.process(record("1", "Quarterly sync", "b")).await;
        p.process(record("2", "Quarterly sync", "b")).await;

        let skips: Vec<_> = sink
            .entries()
            .into_iter()
            .filter(|e| e.log_type == LogType::Skip)
            .collect();
        assert_eq!(skips.len(), 1);
        assert!(skips[0].reference.contains("Quarterly sync"));
    }

    #[tokio::test]
    async fn duplicate_in_replies_also_skips() {
        let store = Arc::new(MemStore::default());
        let sink = Arc::new(RecordingSink::default());
        let p = processor(Arc::clone(&store), Arc::clone(&sink), json!({}));

        // "Follow up" routes to replies.
        p.process(record("1", "Follow up", "b")).await;
        let outcome = p.process(record("2", "follow up", "b")).await;
        assert_eq!(outcome.status, ItemStatus::Skipped);
        assert_eq!(store.count(Destination::Replies), 1);
    }

    // ── Extraction ──────────────────────────────────────────────────

    #[tokio::test]
    async fn extraction_failure_is_isolated_within_batch() {
        let store = Arc::new(MemStore::default());
        let sink = Arc::new(RecordingSink::default());
        let p = processor(Arc::clone(&store), Arc::clone(&sink), json!({}));

        let outcomes = p
            .process_batch(vec![
                record("1", "Interview Support A", "fine"),
                record("2", "Interview Support B", "boom"),
                record("3", "Interview Support C", "fine"),
            ])
            .await;

        assert_eq!(outcomes[0].status, ItemStatus::Success);
        assert_eq!(outcomes[1].status, ItemStatus::Error);
        assert!(outcomes[1].error.as_deref().unwrap().contains("not valid JSON"));
        assert_eq!(outcomes[2].status, ItemStatus::Success);
        assert_eq!(store.count(Destination::Tasks), 2);
    }

    #[tokio::test]
    async fn extraction_failure_emits_error_entry() {
        let store = Arc::new(MemStore::default());
        let sink = Arc::new(RecordingSink::default());
        let p = processor(store, Arc::clone(&sink), json!({}));

        p.process(record("1", "Interview Support", "boom")).await;

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].log_type, LogType::Error);
    }

    // ── Merge + classification + write ──────────────────────────────

    #[tokio::test]
    async fn extracted_fields_win_in_stored_record() {
        let store = Arc::new(MemStore::default());
        let sink = Arc::new(RecordingSink::default());
        let p = processor(
            Arc::clone(&store),
            sink,
            json!({"Technology": "Rust", "Candidate Name": "Jane Doe"}),
        );

        let mut rec = record("1", "Interview Support for Jane", "body");
        rec.extra.insert("Technology".into(), json!("stale"));
        p.process(rec).await;

        let rows = store.tasks.lock().unwrap();
        let (_, stored) = &rows[0];
        assert_eq!(stored["Technology"], "Rust");
        assert_eq!(stored["Candidate Name"], "Jane Doe");
        assert_eq!(stored["subject"], "Interview Support for Jane");
        assert_eq!(stored["id"], "1");
    }

    #[tokio::test]
    async fn task_subject_routes_to_tasks_collection() {
        let store = Arc::new(MemStore::default());
        let sink = Arc::new(RecordingSink::default());
        let p = processor(Arc::clone(&store), sink, json!({}));

        let outcome = p
            .process(record("1", "Interview Support for Jane Doe", "b"))
            .await;
        assert_eq!(outcome.collection.as_deref(), Some("tasks"));
        assert_eq!(store.count(Destination::Tasks), 1);
        assert_eq!(store.count(Destination::Replies), 0);
    }

    #[tokio::test]
    async fn reply_subject_routes_to_replies_collection() {
        let store = Arc::new(MemStore::default());
        let sink = Arc::new(RecordingSink::default());
        let p = processor(Arc::clone(&store), sink, json!({}));

        let outcome = p
            .process(record("1", "RE: Interview Support for Jane Doe", "b"))
            .await;
        assert_eq!(outcome.collection.as_deref(), Some("replies"));
        assert_eq!(store.count(Destination::Replies), 1);
    }

    #[tokio::test]
    async fn write_failure_reports_error_and_batch_continues() {
        let store = Arc::new(MemStore {
            fail_inserts: true,
            ..Default::default()
        });
        let sink = Arc::new(RecordingSink::default());
        let p = processor(Arc::clone(&store), Arc::clone(&sink), json!({}));

        let outcomes = p
            .process_batch(vec![
                record("1", "Interview Support A", "b"),
                record("2", "Interview Support B", "b"),
            ])
            .await;

        assert_eq!(outcomes.len(), 2);
        for outcome in &outcomes {
            assert_eq!(outcome.status, ItemStatus::Error);
            assert!(outcome.error.as_deref().unwrap().contains("disk full"));
        }
        let entries = sink.entries();
        assert!(entries.iter().all(|e| e.log_type == LogType::Error));
    }

    // ── Audit policy ────────────────────────────────────────────────

    #[tokio::test]
    async fn successful_write_emits_info_entry_with_collection() {
        let store = Arc::new(MemStore::default());
        let sink = Arc::new(RecordingSink::default());
        let p = processor(store, Arc::clone(&sink), json!({}));

        p.process(record("1", "Interview Support", "b")).await;

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].log_type, LogType::Info);
        assert_eq!(entries[0].collection.as_deref(), Some("tasks"));
    }

    #[tokio::test]
    async fn audit_failure_after_write_downgrades_to_warning() {
        let store = Arc::new(MemStore::default());
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let p = processor(Arc::clone(&store), sink, json!({}));

        let outcome = p.process(record("1", "Interview Support", "b")).await;
        assert_eq!(outcome.status, ItemStatus::Warning);
        assert!(
            outcome
                .message
                .as_deref()
                .unwrap()
                .contains("audit emission failed")
        );
        // The write stands.
        assert_eq!(store.count(Destination::Tasks), 1);
    }

    #[tokio::test]
    async fn audit_failure_on_skip_keeps_skipped_status() {
        let store = Arc::new(MemStore::default());
        let seeded = Arc::new(RecordingSink::default());
        let p = processor(Arc::clone(&store), seeded, json!({}));
        p.process(record("1", "Interview Support", "b")).await;

        let failing_sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let p = processor(store, failing_sink, json!({}));
        let outcome = p.process(record("2", "Interview Support", "b")).await;
        assert_eq!(outcome.status, ItemStatus::Skipped);
    }

    #[tokio::test]
    async fn every_item_produces_exactly_one_audit_entry() {
        let store = Arc::new(MemStore::default());
        let sink = Arc::new(RecordingSink::default());
        let p = processor(store, Arc::clone(&sink), json!({}));

        p.process_batch(vec![
            record("1", "Interview Support A", "b"),
            record("2", "interview support a", "b"), // duplicate → skip
            record("3", "Interview Support C", "boom"), // extraction error
        ])
        .await;

        assert_eq!(sink.entries().len(), 3);
    }
}
