//! Audit trail for pipeline outcomes.
//!
//! Every item that reaches the pipeline produces exactly one audit entry —
//! `skip`, `error`, or `info` — sent to an external sink as a best-effort
//! side effect. Sink failures never roll back or block the main outcome;
//! whether they surface in the item's reported status is the processor's
//! policy, not the sink's.

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuditError;

pub use http::HttpAuditSink;

/// Kind of audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    /// Duplicate subject — item not processed.
    Skip,
    /// Extraction or write failure, or a rejected payload.
    Error,
    /// Successful write.
    Info,
}

/// One audit entry describing one pipeline outcome.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub log_type: LogType,
    /// Subject plus timestamp — ties the entry back to the item.
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Destination collection name, present on write outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Entry for a duplicate-subject skip.
    pub fn skip(subject: &str, reason: impl Into<String>) -> Self {
        Self {
            log_type: LogType::Skip,
            reference: reference_for(subject),
            message: Some(reason.into()),
            collection: None,
            error: None,
            logged_at: Utc::now(),
        }
    }

    /// Entry for a per-item or payload-level failure.
    pub fn error(subject: &str, error: impl Into<String>) -> Self {
        Self {
            log_type: LogType::Error,
            reference: reference_for(subject),
            message: None,
            collection: None,
            error: Some(error.into()),
            logged_at: Utc::now(),
        }
    }

    /// Entry for a successful write into `collection`.
    pub fn info(subject: &str, collection: &str, message: impl Into<String>) -> Self {
        Self {
            log_type: LogType::Info,
            reference: reference_for(subject),
            message: Some(message.into()),
            collection: Some(collection.to_string()),
            error: None,
            logged_at: Utc::now(),
        }
    }
}

/// Build the reference string for a subject: `<subject> @ <timestamp>`.
fn reference_for(subject: &str) -> String {
    let subject = subject.trim();
    let subject = if subject.is_empty() {
        "(no subject)"
    } else {
        subject
    };
    format!("{} @ {}", subject, Utc::now().to_rfc3339())
}

/// Best-effort sink for audit entries — pure I/O, no policy.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Send one entry. Callers treat failures as fire-and-forget.
    async fn emit(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}
