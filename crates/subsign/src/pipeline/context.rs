use serde::{Deserialize, Serialize};

use crate::model::{Countersigner, PositionSlot, SignerRole};

use super::error::PipelineWarning;

/// One invocation of the signature pipeline, as received from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigningRequest {
    pub document_id: String,
    pub subscription_id: String,
    /// Investor-member ids chosen by the caller. Empty or absent means
    /// "derive from the investor".
    #[serde(default)]
    pub signatory_ids: Option<Vec<String>>,
    /// Organization countersigning on the platform's behalf.
    #[serde(default)]
    pub delegate_organization_id: Option<String>,
    /// Profile of the operator invoking the pipeline.
    #[serde(default)]
    pub operator_profile_id: Option<String>,
}

impl SigningRequest {
    pub fn new(document_id: impl Into<String>, subscription_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            subscription_id: subscription_id.into(),
            signatory_ids: None,
            delegate_organization_id: None,
            operator_profile_id: None,
        }
    }

    /// Caller-selected signatories, if any were given.
    pub fn requested_signatories(&self) -> Option<&[String]> {
        self.signatory_ids
            .as_deref()
            .filter(|ids| ids.iter().any(|id| !id.trim().is_empty()))
    }
}

/// A signature request that exists both at the provider and locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedRequest {
    /// Local `signature_requests` row id.
    pub request_id: String,
    pub external_request_id: String,
    pub signer_ref: String,
    pub signer_name: String,
    pub signer_email: String,
    pub role: SignerRole,
    pub slot: PositionSlot,
    pub signing_token: String,
}

/// State carried between pipeline steps.
pub struct PipelineContext {
    // Input
    pub request: SigningRequest,

    // Requests created so far, in issue order
    pub issued: Vec<IssuedRequest>,

    // Provider ids of every request the provider accepted, recorded or not
    pub accepted: Vec<String>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(request: SigningRequest) -> Self {
        Self {
            request,
            issued: Vec::new(),
            accepted: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn issued_ids(&self) -> Vec<String> {
        self.issued.iter().map(|r| r.request_id.clone()).collect()
    }

    /// Whether the provider holds any request from this run. Once it does,
    /// the document claim must survive a failure.
    pub fn reached_provider(&self) -> bool {
        !self.accepted.is_empty()
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct SigningOutcome {
    /// The signable document actually sent. Differs from
    /// `source_document_id` when a conversion took place or the
    /// requested document had already been superseded.
    pub document_id: String,
    pub source_document_id: String,
    pub converted: bool,
    pub signatory_requests: Vec<IssuedRequest>,
    pub countersigner_request: IssuedRequest,
    pub countersigner: Countersigner,
    pub countersigner_role: SignerRole,
    pub warnings: Vec<PipelineWarning>,
}

impl SigningOutcome {
    /// Every created request id, signatories first.
    pub fn request_ids(&self) -> Vec<String> {
        self.signatory_requests
            .iter()
            .chain(std::iter::once(&self.countersigner_request))
            .map(|r| r.request_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialises_with_optional_fields() {
        let request: SigningRequest =
            serde_json::from_str(r#"{"document_id": "d1", "subscription_id": "s1"}"#).unwrap();
        assert_eq!(request, SigningRequest::new("d1", "s1"));
        assert!(request.requested_signatories().is_none());
    }

    #[test]
    fn test_request_rejects_unknown_fields() {
        let result: Result<SigningRequest, _> = serde_json::from_str(
            r#"{"document_id": "d1", "subscription_id": "s1", "signers": []}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_signatory_selection_counts_as_absent() {
        let mut request = SigningRequest::new("d1", "s1");
        request.signatory_ids = Some(vec![]);
        assert!(request.requested_signatories().is_none());
        request.signatory_ids = Some(vec!["  ".to_string()]);
        assert!(request.requested_signatories().is_none());
        request.signatory_ids = Some(vec!["m1".to_string()]);
        assert_eq!(request.requested_signatories().unwrap().len(), 1);
    }
}
