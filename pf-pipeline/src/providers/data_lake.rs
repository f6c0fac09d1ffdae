//! Data-lake finder: phone (and incidental email) lookups
//!
//! Synchronous provider; supports both Domain and LinkedIn search modes.
//! Credit exhaustion arrives either as HTTP 402 or as a `no_credits` status
//! in the response body.

use super::{FindOpts, ProviderAdapter, ProviderError, ProviderOutcome};
use crate::models::{Identity, Provider, SearchMode};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Total request timeout; a timed-out call is a transient failure
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DataLakeClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    first_name: &'a str,
    last_name: &'a str,
    full_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_domain: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    linkedin: Option<&'a str>,
    want_emails: bool,
    want_phones: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    emails: Vec<String>,
    #[serde(default)]
    phones: Vec<String>,
}

impl DataLakeClient {
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

    fn parse_response(status: StatusCode, body: SearchResponse) -> ProviderOutcome {
        if status == StatusCode::PAYMENT_REQUIRED || body.status == "no_credits" {
            return ProviderOutcome {
                no_credits: true,
                ..ProviderOutcome::default()
            };
        }

        ProviderOutcome {
            emails: body.emails,
            phones: body.phones,
            still_searching: false,
            no_credits: false,
        }
    }
}

#[async_trait]
impl ProviderAdapter for DataLakeClient {
    fn provider(&self) -> Provider {
        Provider::DataLake
    }

    async fn find(
        &self,
        identity: &Identity,
        opts: &FindOpts,
    ) -> Result<ProviderOutcome, ProviderError> {
        let request = SearchRequest {
            first_name: &identity.first_name,
            last_name: &identity.last_name,
            full_name: &identity.name,
            company_domain: match opts.mode {
                SearchMode::Domain => identity.company_domain.as_deref(),
                SearchMode::LinkedIn => None,
            },
            linkedin: match opts.mode {
                SearchMode::LinkedIn => identity.linkedin_handle.as_deref(),
                SearchMode::Domain => None,
            },
            want_emails: opts.need_email,
            want_phones: opts.need_phone,
        };

        debug!(
            user_id = %identity.user_id,
            mode = opts.mode.as_str(),
            "Calling data-lake provider"
        );

        let response = self
            .http_client
            .post(format!("{}/v1/person/search", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("Data-lake request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::PAYMENT_REQUIRED {
            return Ok(ProviderOutcome {
                no_credits: true,
                ..ProviderOutcome::default()
            });
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(ProviderOutcome::no_match());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!(
                "Data-lake returned {}: {}",
                status, body
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse data-lake response: {}", e)))?;

        Ok(Self::parse_response(status, body))
    }
}
