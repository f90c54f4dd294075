use crate::credentials::set::CredentialSet;
use crate::error::{AcquireError, Strategy};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Successful reply from the provider token endpoint.
#[derive(Debug, Deserialize)]
pub struct DirectGrant {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: String,
    error_description: Option<String>,
}

/// Client-credentials exchange made straight against the identity provider's
/// region-specific token endpoint.
#[derive(Debug, Clone)]
pub struct DirectExchange {
    client: Client,
    /// Overrides the region-derived endpoint. Used for non-production
    /// provider domains.
    token_url: Option<String>,
}

impl DirectExchange {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            token_url: None,
        }
    }

    pub fn with_token_url(client: Client, token_url: String) -> Self {
        Self {
            client,
            token_url: Some(token_url),
        }
    }

    fn endpoint(&self, credentials: &CredentialSet) -> String {
        self.token_url
            .clone()
            .unwrap_or_else(|| format!("{}/oauth2/token", credentials.region.auth_domain()))
    }

    /// One client-credentials exchange. Credentials must already be complete;
    /// the store guarantees that for anything it hands out.
    pub async fn request_token(
        &self,
        credentials: &CredentialSet,
    ) -> Result<DirectGrant, AcquireError> {
        let url = self.endpoint(credentials);
        debug!(region = %credentials.region, "performing direct client-credentials exchange");

        let response = self
            .client
            .post(&url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("tenant_id", credentials.tenant_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AcquireError::transient(Strategy::Direct, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AcquireError::transient(Strategy::Direct, e.to_string()))?;

        if !status.is_success() {
            let reason = match serde_json::from_str::<ProviderError>(&body) {
                Ok(err) => format!(
                    "{}: {}",
                    err.error,
                    err.error_description.unwrap_or_default()
                ),
                Err(_) => format!("provider returned {status}"),
            };
            return Err(AcquireError::transient(Strategy::Direct, reason));
        }

        serde_json::from_str(&body)
            .map_err(|e| AcquireError::transient(Strategy::Direct, e.to_string()))
    }
}
