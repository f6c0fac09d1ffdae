//! Primary email finder: domain-based, async-capable
//!
//! May answer immediately, or report `searching` and deliver the final
//! result later to the webhook URL supplied in the request. The caller must
//! not finalize the task while `still_searching` is set.

use super::{FindOpts, ProviderAdapter, ProviderError, ProviderOutcome};
use crate::models::{Identity, Provider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DomainEmailClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct FinderRequest<'a> {
    first_name: &'a str,
    last_name: &'a str,
    domain: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    webhook_url: Option<&'a str>,
}

/// Synchronous answer; the same shape arrives later on the webhook
#[derive(Debug, Deserialize)]
pub struct FinderResponse {
    /// "completed", "searching", or "no_credits"
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub emails: Vec<String>,
}

impl DomainEmailClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            base_url,
            api_key,
        }
    }

    fn parse_response(body: FinderResponse) -> ProviderOutcome {
        match body.status.as_str() {
            "no_credits" => ProviderOutcome {
                no_credits: true,
                ..ProviderOutcome::default()
            },
            "searching" => ProviderOutcome {
                still_searching: true,
                ..ProviderOutcome::default()
            },
            _ => ProviderOutcome {
                emails: body.emails,
                ..ProviderOutcome::default()
            },
        }
    }
}

#[async_trait]
impl ProviderAdapter for DomainEmailClient {
    fn provider(&self) -> Provider {
        Provider::DomainEmail
    }

    async fn find(
        &self,
        identity: &Identity,
        opts: &FindOpts,
    ) -> Result<ProviderOutcome, ProviderError> {
        // Phone is not a capability of this provider; domain is required
        let Some(domain) = identity.company_domain.as_deref() else {
            return Ok(ProviderOutcome::no_match());
        };

        let request = FinderRequest {
            first_name: &identity.first_name,
            last_name: &identity.last_name,
            domain,
            webhook_url: opts.webhook_url.as_deref(),
        };

        debug!(
            user_id = %identity.user_id,
            domain = domain,
            webhook = opts.webhook_url.is_some(),
            "Calling domain email finder"
        );

        let response = self
            .http_client
            .post(format!("{}/v2/email-finder", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("Email finder request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::PAYMENT_REQUIRED {
            return Ok(ProviderOutcome {
                no_credits: true,
                ..ProviderOutcome::default()
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!(
                "Email finder returned {}: {}",
                status, body
            )));
        }

        let body: FinderResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse email finder response: {}", e)))?;

        Ok(Self::parse_response(body))
    }
}
