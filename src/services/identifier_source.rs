//! CVU/Alias issuance: external API first, configured backup pair second.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::GatewayConfig;
use crate::errors::ServiceError;
use crate::models::{IdentifierAssignment, IdentifierPair, OrderId};

/// Failures talking to the identifier API. Never surfaced to shoppers.
#[derive(Debug, Error)]
pub enum IdentifierApiError {
    #[error("identifier API is not configured")]
    NotConfigured,
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("response is missing cvu or alias")]
    MissingFields,
}

/// One issuance call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierRequest {
    /// Sent as `number`
    pub reference: OrderId,
    pub url: String,
    pub token: String,
    pub timeout: Duration,
}

impl IdentifierRequest {
    pub fn from_config(reference: OrderId, config: &GatewayConfig) -> Self {
        Self {
            reference,
            url: config.api_url.trim().to_string(),
            token: config.api_token.clone(),
            timeout: config.api_timeout(),
        }
    }
}

/// Outbound identifier API seam
#[async_trait]
pub trait IdentifierApi: Send + Sync {
    async fn issue(&self, request: IdentifierRequest) -> Result<IdentifierPair, IdentifierApiError>;
}

/// reqwest-backed client: form POST, `Authorization: Token <token>`, JSON `{cvu, alias}` back.
#[derive(Clone, Debug, Default)]
pub struct HttpIdentifierApi {
    client: reqwest::Client,
}

impl HttpIdentifierApi {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn text_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl IdentifierApi for HttpIdentifierApi {
    async fn issue(&self, request: IdentifierRequest) -> Result<IdentifierPair, IdentifierApiError> {
        if request.url.is_empty() {
            return Err(IdentifierApiError::NotConfigured);
        }

        let number = request.reference.to_string();
        let response = self
            .client
            .post(&request.url)
            .header(AUTHORIZATION, format!("Token {}", request.token))
            .form(&[("number", number.as_str())])
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IdentifierApiError::Timeout(request.timeout)
                } else {
                    IdentifierApiError::Transport(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentifierApiError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| IdentifierApiError::Malformed(e.to_string()))?;

        let pair = match (text_field(&body, "cvu"), text_field(&body, "alias")) {
            (Some(cvu), Some(alias)) => IdentifierPair::new(cvu, alias),
            _ => return Err(IdentifierApiError::MissingFields),
        };
        if !pair.is_complete() {
            return Err(IdentifierApiError::MissingFields);
        }

        debug!(reference = %request.reference, "identifier issued by API");
        Ok(pair)
    }
}

/// Chooses between the API and the backup pair.
#[derive(Clone)]
pub struct IdentifierSource {
    api: Arc<dyn IdentifierApi>,
}

impl IdentifierSource {
    pub fn new(api: Arc<dyn IdentifierApi>) -> Self {
        Self { api }
    }

    /// Obtains a pair for `reference`, falling back to the backup pair on any API failure.
    #[instrument(skip(self, config), fields(reference = %reference))]
    pub async fn acquire(
        &self,
        reference: OrderId,
        config: &GatewayConfig,
    ) -> Result<IdentifierAssignment, ServiceError> {
        let request = IdentifierRequest::from_config(reference, config);
        match self.api.issue(request).await {
            Ok(pair) => return Ok(IdentifierAssignment::api(pair)),
            Err(err) => {
                warn!(error = %err, "identifier API failed, trying backup pair");
            }
        }

        match config.backup_pair() {
            Some(pair) => {
                info!("using backup identifier pair");
                Ok(IdentifierAssignment::backup(pair))
            }
            None => {
                warn!("no identifier available: API failed and no backup pair configured");
                Err(ServiceError::NoIdentifierAvailable)
            }
        }
    }
}
