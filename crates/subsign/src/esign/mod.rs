//! Client side of the external e-signature capability.

pub mod client;

use serde::{Deserialize, Serialize};

use crate::model::{PositionSlot, SignerRole};

pub use client::{HttpSignatureService, SignatureServiceError};

/// Identifiers echoed back by the provider in its callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Correlation {
    pub document_id: String,
    pub subscription_id: String,
    pub signer_ref: String,
}

/// One signing party on one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureRequestSpec {
    pub document_url: String,
    pub signer_name: String,
    pub signer_email: String,
    pub role: SignerRole,
    pub position_slot: PositionSlot,
    pub correlation: Correlation,
}

/// What the provider returns for a created request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedSignatureRequest {
    #[serde(rename = "id")]
    pub request_id: String,
    #[serde(rename = "signing_token")]
    pub token: String,
}

pub trait SignatureService: Send + Sync {
    fn create_request(
        &self,
        spec: &SignatureRequestSpec,
    ) -> Result<CreatedSignatureRequest, SignatureServiceError>;
}
