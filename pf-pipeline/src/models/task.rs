//! Per-person resolution unit within a batch

use super::Identity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task lifecycle state
///
/// A task becomes `Completed` exactly once, and only when every requested
/// capability has either produced data or exhausted its fallback chain.
/// `Failed` is reserved for tasks whose job exceeded the transient-retry cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "processing" => Some(TaskStatus::Processing),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }

    /// Terminal states count toward batch completion
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// One person-resolution unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub identity: Identity,
    pub want_email: bool,
    pub want_phone: bool,
    pub status: TaskStatus,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    /// Provenance: ids of every ledger entry consulted for this task
    pub call_ledger_ids: Vec<i64>,
}

impl Task {
    pub fn new(batch_id: Uuid, identity: Identity, want_email: bool, want_phone: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_id,
            identity,
            want_email,
            want_phone,
            status: TaskStatus::Pending,
            emails: Vec::new(),
            phones: Vec::new(),
            call_ledger_ids: Vec::new(),
        }
    }
}
