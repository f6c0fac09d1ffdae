//! Batch aggregate: a submitted group of contact-discovery tasks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored batch status
///
/// The Pending→Completed transition is a compare-and-set owned by the batch
/// completion check; it happens exactly once per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Completed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BatchStatus::Pending),
            "completed" => Some(BatchStatus::Completed),
            _ => None,
        }
    }
}

/// Derived batch phase reported to polling clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPhase {
    /// No task has started yet
    Pending,
    /// At least one task started, not all terminal
    Processing,
    /// All tasks terminal and the aggregate callback dispatched
    Completed,
}

/// A submitted group of tasks tracked to a single completion event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    /// Caller-supplied correlation key
    pub external_ref: String,
    pub status: BatchStatus,
    /// Where to POST the aggregate export when the batch completes
    pub callback_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Batch {
    pub fn new(external_ref: impl Into<String>, callback_url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_ref: external_ref.into(),
            status: BatchStatus::Pending,
            callback_url,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Per-subject aggregation for batch export
///
/// Tasks sharing a `user_id` are merged; email/phone lists are concatenated
/// in task order and deliberately not deduplicated at this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectContacts {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userSource")]
    pub user_source: String,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
}

/// Aggregate payload delivered by the batch callback and the export endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchExport {
    #[serde(rename = "batchId")]
    pub batch_id: String,
    pub subjects: Vec<SubjectContacts>,
}
