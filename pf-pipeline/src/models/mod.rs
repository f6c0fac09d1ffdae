//! Domain model types for the contact-discovery pipeline

pub mod batch;
pub mod identity;
pub mod ledger;
pub mod task;

pub use batch::{Batch, BatchExport, BatchPhase, BatchStatus, SubjectContacts};
pub use identity::{split_multi_value, Identity, MULTI_VALUE_SEPARATOR};
pub use ledger::{CallLedgerEntry, LedgerStatus, Provider, SearchMode};
pub use task::{Task, TaskStatus};
