//! Per-item ingestion pipeline.
//!
//! Every submitted record flows through, strictly in order:
//! 1. Batch normalization — single object or array → ordered records
//! 2. Duplicate filter — case-insensitive subject lookup in both destinations
//! 3. Extraction — one fixed-prompt call to the extraction service
//! 4. Merge + classify + write — extracted fields win on collision
//! 5. Audit emission — best effort, never rolls back the write
//!
//! Items are independent: one item's failure never aborts the batch.

pub mod processor;
pub mod routing;
pub mod types;
