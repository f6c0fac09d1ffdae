//! Secondary email finder: LinkedIn-profile based, synchronous
//!
//! The fallback when the domain finder completes empty-handed. Requires a
//! LinkedIn handle; without one the lookup is a definitive no-match.

use super::{FindOpts, ProviderAdapter, ProviderError, ProviderOutcome};
use crate::models::{Identity, Provider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ProfileEmailClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ProfileRequest<'a> {
    linkedin: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    emails: Vec<String>,
}

impl ProfileEmailClient {
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
}

#[async_trait]
impl ProviderAdapter for ProfileEmailClient {
    fn provider(&self) -> Provider {
        Provider::ProfileEmail
    }

    async fn find(
        &self,
        identity: &Identity,
        _opts: &FindOpts,
    ) -> Result<ProviderOutcome, ProviderError> {
        let Some(linkedin) = identity.linkedin_handle.as_deref() else {
            return Ok(ProviderOutcome::no_match());
        };

        debug!(user_id = %identity.user_id, linkedin = linkedin, "Calling profile email finder");

        let response = self
            .http_client
            .post(format!("{}/v1/profile/email", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .json(&ProfileRequest { linkedin })
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("Profile finder request failed: {}", e)))?;

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
                "Profile finder returned {}: {}",
                status, body
            )));
        }

        let body: ProfileResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse profile response: {}", e)))?;

        if body.status == "no_credits" {
            return Ok(ProviderOutcome {
                no_credits: true,
                ..ProviderOutcome::default()
            });
        }

        Ok(ProviderOutcome {
            emails: body.emails,
            ..ProviderOutcome::default()
        })
    }
}
