//! Destination classification for merged records.
//!
//! Task requests land in the `tasks` collection; everything else — replies
//! and unrelated mail — lands in `replies`. The rule is a fixed subject-text
//! check, no LLM involved.

use serde::{Deserialize, Serialize};

/// Subject marker identifying a new interview-support request.
const TASK_MARKER: &str = "interview support";

/// Reply-convention prefix. A subject starting with it is never a new task.
const REPLY_PREFIX: &str = "re:";

/// Storage destination for a merged record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// New interview-support requests.
    Tasks,
    /// Replies and everything else.
    Replies,
}

impl Destination {
    /// All destinations, in the order the duplicate filter probes them.
    pub const ALL: [Destination; 2] = [Destination::Tasks, Destination::Replies];

    /// Collection name as reported to callers and the audit sink.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Replies => "replies",
        }
    }

    /// Backing table name in the record store.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Tasks => "task_records",
            Self::Replies => "reply_records",
        }
    }
}

/// Classify a subject line into its destination.
///
/// `Tasks` iff the lower-cased subject contains the task marker and does not
/// start with the reply prefix; otherwise `Replies`.
pub fn route(subject: &str) -> Destination {
    let normalized = subject.trim().to_lowercase();
    if normalized.contains(TASK_MARKER) && !normalized.starts_with(REPLY_PREFIX) {
        Destination::Tasks
    } else {
        Destination::Replies
    }
}
