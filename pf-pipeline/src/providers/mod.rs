//! Provider adapters: uniform contract over the three data sources
//!
//! Each adapter answers `find` with whatever subset of capabilities it can
//! supply; unsupported capabilities come back empty, never as errors.
//! Credit exhaustion is reported in-band (`no_credits`) because it must
//! escalate to a batch pause rather than fail a single lookup. Transport
//! failures and timeouts are `ProviderError::Transport` and are treated as
//! transient by the caller.

pub mod data_lake;
pub mod domain_email;
pub mod profile_email;

pub use data_lake::DataLakeClient;
pub use domain_email::DomainEmailClient;
pub use profile_email::ProfileEmailClient;

use crate::models::{Identity, Provider, SearchMode};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Capabilities requested from a single `find` call
#[derive(Debug, Clone)]
pub struct FindOpts {
    pub need_email: bool,
    pub need_phone: bool,
    pub mode: SearchMode,
    /// Callback URL for providers that answer asynchronously
    pub webhook_url: Option<String>,
}

/// Uniform provider answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderOutcome {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    /// The answer will arrive later via webhook; do not finalize the task
    pub still_searching: bool,
    /// Credit exhaustion; distinct from "no match" (empty lists)
    pub no_credits: bool,
}

impl ProviderOutcome {
    /// A definitive empty answer (no match, not an error)
    pub fn no_match() -> Self {
        Self::default()
    }
}

/// Adapter call failure (transport or malformed response)
///
/// Both variants are transient from the pipeline's point of view: the job is
/// re-queued and the waterfall may continue past the failing provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Unexpected provider response: {0}")]
    Parse(String),
}

/// Uniform lookup contract implemented by all three adapters
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which ledger provider this adapter writes under
    fn provider(&self) -> Provider;

    async fn find(
        &self,
        identity: &Identity,
        opts: &FindOpts,
    ) -> Result<ProviderOutcome, ProviderError>;
}

/// The three adapters, injected into the processor as one bundle
#[derive(Clone)]
pub struct ProviderSet {
    pub data_lake: Arc<dyn ProviderAdapter>,
    pub domain_email: Arc<dyn ProviderAdapter>,
    pub profile_email: Arc<dyn ProviderAdapter>,
}

impl ProviderSet {
    /// Resolve an adapter by ledger provider
    pub fn get(&self, provider: Provider) -> &Arc<dyn ProviderAdapter> {
        match provider {
            Provider::DataLake => &self.data_lake,
            Provider::DomainEmail => &self.domain_email,
            Provider::ProfileEmail => &self.profile_email,
        }
    }
}
