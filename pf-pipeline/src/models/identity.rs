//! Subject identity for contact lookups
//!
//! Two identities refer to the same subject when `user_id` and `user_source`
//! match; the remaining fields are search inputs, not identity.

use serde::{Deserialize, Serialize};

/// Separator token for multi-valued `companyDomain`/`linkedin` submission
/// fields; each value expands into its own task.
pub const MULTI_VALUE_SEPARATOR: char = '|';

/// The subject being searched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Caller-supplied subject id, stable across batches
    pub user_id: String,
    /// Namespace for `user_id` (which upstream system issued it)
    pub user_source: String,
    /// Full name as submitted
    pub name: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub company_domain: Option<String>,
    pub linkedin_handle: Option<String>,
}

impl Identity {
    /// Build an identity from submission fields, deriving the name parts
    pub fn new(
        user_id: impl Into<String>,
        user_source: impl Into<String>,
        name: impl Into<String>,
        company_domain: Option<String>,
        linkedin_handle: Option<String>,
    ) -> Self {
        let name = name.into();
        let (first_name, middle_name, last_name) = split_name(&name);
        Self {
            user_id: user_id.into(),
            user_source: user_source.into(),
            name,
            first_name,
            middle_name,
            last_name,
            company_domain: none_if_blank(company_domain),
            linkedin_handle: none_if_blank(linkedin_handle),
        }
    }

    /// True when a LinkedIn-mode search is possible
    pub fn has_linkedin(&self) -> bool {
        self.linkedin_handle.is_some()
    }

    /// True when a domain-mode search is possible
    pub fn has_domain(&self) -> bool {
        self.company_domain.is_some()
    }
}

fn none_if_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

/// Split a full name into (first, middle, last) on whitespace
///
/// Single-token names become the first name; the last token is the last
/// name; anything between is joined as the middle name.
fn split_name(name: &str) -> (String, String, String) {
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.len() {
        0 => (String::new(), String::new(), String::new()),
        1 => (parts[0].to_string(), String::new(), String::new()),
        2 => (parts[0].to_string(), String::new(), parts[1].to_string()),
        n => (
            parts[0].to_string(),
            parts[1..n - 1].join(" "),
            parts[n - 1].to_string(),
        ),
    }
}

/// Expand a multi-valued submission field on the separator token
pub fn split_multi_value(value: &str) -> Vec<String> {
    value
        .split(MULTI_VALUE_SEPARATOR)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
