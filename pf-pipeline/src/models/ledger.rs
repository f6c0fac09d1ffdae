//! Call ledger: the idempotent record of every distinct provider attempt
//!
//! One entry per distinct (provider, search mode, subject identity). The
//! entry doubles as the dedup index: a second lookup for the same triple
//! reuses the first entry's result instead of paying for another call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three provider adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Phone/email data-lake finder
    DataLake,
    /// Primary domain-based email finder (answers via webhook when slow)
    DomainEmail,
    /// Secondary LinkedIn-based email finder
    ProfileEmail,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::DataLake => "data_lake",
            Provider::DomainEmail => "domain_email",
            Provider::ProfileEmail => "profile_email",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "data_lake" => Some(Provider::DataLake),
            "domain_email" => Some(Provider::DomainEmail),
            "profile_email" => Some(Provider::ProfileEmail),
            _ => None,
        }
    }
}

/// How the subject is addressed in a provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Search by name + company domain
    Domain,
    /// Search by LinkedIn handle
    LinkedIn,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Domain => "domain",
            SearchMode::LinkedIn => "linkedin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "domain" => Some(SearchMode::Domain),
            "linkedin" => Some(SearchMode::LinkedIn),
            _ => None,
        }
    }
}

/// Ledger entry lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    /// Created before the call; also the awaiting-webhook state
    Pending,
    /// Provider answered; result fields are final
    Completed,
    /// Call failed (transport error); the row is reused on retry
    Failed,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Pending => "pending",
            LedgerStatus::Completed => "completed",
            LedgerStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LedgerStatus::Pending),
            "completed" => Some(LedgerStatus::Completed),
            "failed" => Some(LedgerStatus::Failed),
            _ => None,
        }
    }
}

/// One outbound provider attempt
///
/// `company_domain` is blanked for LinkedIn-mode entries so that a later
/// domain-mode lookup for the same subject can find and reuse them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallLedgerEntry {
    pub id: i64,
    pub provider: Provider,
    pub search_mode: SearchMode,
    pub user_id: String,
    pub user_source: String,
    pub name: String,
    /// Normalized dedup-key domain (empty string in LinkedIn mode)
    pub company_domain: String,
    pub linkedin_handle: String,
    pub status: LedgerStatus,
    /// Raw provider response, kept for audit
    pub result_payload: Option<serde_json::Value>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
