use crate::acquisition::token::TokenInfo;
use crate::error::{AcquireError, Strategy};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Wire shape of a broker reply. The broker speaks camelCase.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrokerResponse {
    success: bool,
    token: Option<String>,
    token_info: Option<BrokerTokenInfo>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrokerTokenInfo {
    expires_at: i64,
    token_type: Option<String>,
}

/// Token granted by the broker. Structured metadata is optional; when the
/// broker omits it the coordinator falls back to decoding the token claims.
#[derive(Debug, Clone)]
pub struct BrokerGrant {
    pub token: String,
    pub token_info: Option<TokenInfo>,
}

/// Client for the trusted broker endpoint, tried before direct exchange.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    client: Client,
    url: String,
}

impl BrokerClient {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }

    /// One broker exchange. Every failure here is transient: the coordinator
    /// logs it and falls back to direct exchange within the same cycle.
    pub async fn request_token(&self, tenant_id: &str) -> Result<BrokerGrant, AcquireError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "tenantId": tenant_id }))
            .send()
            .await
            .map_err(|e| AcquireError::transient(Strategy::Broker, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::transient(
                Strategy::Broker,
                format!("broker returned {status}"),
            ));
        }

        let body: BrokerResponse = response
            .json()
            .await
            .map_err(|e| AcquireError::transient(Strategy::Broker, e.to_string()))?;

        if !body.success {
            return Err(AcquireError::transient(
                Strategy::Broker,
                body.message
                    .unwrap_or_else(|| "broker declined the request".to_string()),
            ));
        }

        let token = body.token.ok_or_else(|| {
            AcquireError::transient(Strategy::Broker, "broker reply carried no token")
        })?;

        debug!(has_token_info = body.token_info.is_some(), "broker granted a token");
        Ok(BrokerGrant {
            token,
            token_info: body.token_info.map(|info| TokenInfo {
                expires_at: info.expires_at,
                token_type: info.token_type.unwrap_or_else(|| "Bearer".to_string()),
            }),
        })
    }
}
