use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::config::EsignConfig;
use crate::error::ConfigError;
use crate::sanitize::{redact_email, truncate_body};

use super::{CreatedSignatureRequest, SignatureRequestSpec, SignatureService};

#[derive(Debug, thiserror::Error)]
pub enum SignatureServiceError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Signature request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Signature service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Signature service returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("Signature request rejected: {0}")]
    Rejected(String),
}

/// JSON client for the e-signature provider
/// (`POST <base_url>/v1/signature-requests`, bearer authentication).
pub struct HttpSignatureService {
    base_url: String,
    api_key: SecretString,
    client: reqwest::blocking::Client,
}

impl HttpSignatureService {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, SignatureServiceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SignatureServiceError::Client)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    pub fn from_config(config: &EsignConfig) -> Result<Self, ConfigError> {
        let api_key = config.resolve_api_key()?;
        Self::new(
            &config.base_url,
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
        .map_err(|e| ConfigError::Validation {
            message: format!("esign client: {}", e),
        })
    }
}

impl SignatureService for HttpSignatureService {
    fn create_request(
        &self,
        spec: &SignatureRequestSpec,
    ) -> Result<CreatedSignatureRequest, SignatureServiceError> {
        let url = format!("{}/v1/signature-requests", self.base_url);

        tracing::debug!(
            signer = %redact_email(&spec.signer_email),
            role = %spec.role,
            slot = %spec.position_slot,
            "Creating signature request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(spec)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(SignatureServiceError::Status {
                status: status.as_u16(),
                body: truncate_body(&body, 200),
            });
        }

        let created: CreatedSignatureRequest = serde_json::from_str(&body)
            .map_err(|e| SignatureServiceError::InvalidResponse(e.to_string()))?;
        if created.request_id.trim().is_empty() || created.token.trim().is_empty() {
            return Err(SignatureServiceError::InvalidResponse(
                "empty id or signing_token".to_string(),
            ));
        }

        Ok(created)
    }
}
