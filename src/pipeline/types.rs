//! Shared types for the ingestion pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IntakeError;

// ── Inbound record ──────────────────────────────────────────────────

/// One email-derived record as submitted by the caller.
///
/// Only the fields the pipeline acts on are named; everything else the
/// caller sends rides along in `extra` and is persisted untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundRecord {
    /// Opaque caller-supplied identifier. Echoed back in the batch results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Subject line — the dedupe key and the classification input.
    #[serde(default)]
    pub subject: String,
    /// Raw email body handed to the extraction service.
    #[serde(default)]
    pub body: String,
    /// Receipt timestamp, kept under its wire name.
    #[serde(
        rename = "receivedDateTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub received_at: Option<String>,
    /// Arbitrary passthrough fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InboundRecord {
    /// Trimmed subject — the dedupe key.
    pub fn dedupe_subject(&self) -> &str {
        self.subject.trim()
    }

    /// Flatten the record into a JSON object map.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // Unreachable: every field serializes to a JSON-native value.
            _ => Map::new(),
        }
    }
}

/// Overlay extracted fields onto the original record.
///
/// Extraction wins on key collision; record fields without a collision are
/// preserved as-is.
pub fn merged_record(record: &InboundRecord, extracted: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = record.to_map();
    for (key, value) in extracted {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

// ── Batch normalization ─────────────────────────────────────────────

/// Normalize a raw request payload into an ordered record sequence.
///
/// A single object is wrapped into a one-element batch. An empty array,
/// empty object, or any element that is not record-shaped invalidates the
/// whole request.
pub fn normalize_batch(payload: Value) -> Result<Vec<InboundRecord>, IntakeError> {
    let items = match payload {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(IntakeError::InvalidInput("empty batch".into()));
            }
            items
        }
        Value::Object(map) => {
            if map.is_empty() {
                return Err(IntakeError::InvalidInput("empty object".into()));
            }
            vec![Value::Object(map)]
        }
        other => {
            return Err(IntakeError::InvalidInput(format!(
                "expected an object or an array of objects, got {}",
                json_type_name(&other)
            )));
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            return Err(IntakeError::InvalidInput(format!(
                "batch element {index} is not an object"
            )));
        }
        let record: InboundRecord = serde_json::from_value(item).map_err(|e| {
            IntakeError::InvalidInput(format!("batch element {index} is malformed: {e}"))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Short JSON type name for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Per-item outcomes ───────────────────────────────────────────────

/// Final classification of one item's processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Subject already seen — nothing written.
    Skipped,
    /// Written and audited.
    Success,
    /// Written, but the audit emission failed.
    Warning,
    /// Extraction or write failed — nothing (more) happens for this item.
    Error,
}

impl ItemStatus {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One entry in the batch response.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    /// Caller-supplied id, echoed back untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Destination collection name, present when a write was attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
