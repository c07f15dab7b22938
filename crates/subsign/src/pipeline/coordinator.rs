use tracing::{error, info, info_span};

use crate::db::signature_repo::{self, SignatureRequestRow};
use crate::db::Database;
use crate::esign::{Correlation, SignatureRequestSpec, SignatureService};
use crate::model::{Countersigner, PositionSlot, SignatureStatus, Signatory, SignerRole};
use crate::sanitize::redact_email;

use super::context::{IssuedRequest, PipelineContext};
use super::error::PipelineError;

/// One party to issue a request for.
struct Party<'p> {
    signer_ref: &'p str,
    name: &'p str,
    email: &'p str,
    role: SignerRole,
    slot: PositionSlot,
}

/// Issues one signature request per party through the e-signature service
/// and records each one locally as soon as the provider accepts it.
pub struct RequestCoordinator<'a> {
    db: &'a Database,
    esign: &'a dyn SignatureService,
}

impl<'a> RequestCoordinator<'a> {
    pub fn new(db: &'a Database, esign: &'a dyn SignatureService) -> Self {
        Self { db, esign }
    }

    /// Signatories are issued in slot order, the countersigner last. Returns
    /// the countersigner's request; every created request is in `ctx.issued`.
    ///
    /// Stops at the first failure. Requests created before it stay in
    /// `ctx.issued` and in the database; nothing is cancelled.
    pub fn issue_all(
        &self,
        ctx: &mut PipelineContext,
        document_id: &str,
        document_url: &str,
        signatories: &[Signatory],
        countersigner: &Countersigner,
    ) -> Result<IssuedRequest, PipelineError> {
        for s in signatories {
            let party = Party {
                signer_ref: &s.signer_ref,
                name: &s.full_name,
                email: &s.email,
                role: SignerRole::Investor,
                slot: s.slot,
            };
            let issued = self.issue_one(ctx, document_id, document_url, &party)?;
            ctx.issued.push(issued);
        }

        let party = Party {
            signer_ref: countersigner.profile_id(),
            name: &countersigner.name,
            email: &countersigner.email,
            role: countersigner.role(),
            slot: PositionSlot::Countersigner,
        };
        let issued = self.issue_one(ctx, document_id, document_url, &party)?;
        ctx.issued.push(issued.clone());
        Ok(issued)
    }

    fn issue_one(
        &self,
        ctx: &mut PipelineContext,
        document_id: &str,
        document_url: &str,
        party: &Party<'_>,
    ) -> Result<IssuedRequest, PipelineError> {
        let _span = info_span!(
            "issue_request",
            slot = %party.slot,
            role = %party.role,
            signer = %redact_email(party.email),
        )
        .entered();

        let spec = SignatureRequestSpec {
            document_url: document_url.to_string(),
            signer_name: party.name.to_string(),
            signer_email: party.email.to_string(),
            role: party.role,
            position_slot: party.slot,
            correlation: Correlation {
                document_id: document_id.to_string(),
                subscription_id: ctx.request.subscription_id.clone(),
                signer_ref: party.signer_ref.to_string(),
            },
        };

        let created = self
            .esign
            .create_request(&spec)
            .map_err(|e| PipelineError::Upstream {
                party: party.name.to_string(),
                role: party.role,
                slot: party.slot,
                created_request_ids: ctx.issued_ids(),
                source: e,
            })?;
        ctx.accepted.push(created.request_id.clone());

        let now = crate::db::now();
        let row = SignatureRequestRow {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            subscription_id: ctx.request.subscription_id.clone(),
            signer_role: party.role,
            signer_ref: party.signer_ref.to_string(),
            signer_name: party.name.to_string(),
            signer_email: party.email.to_string(),
            position_slot: party.slot,
            status: SignatureStatus::Pending,
            external_request_id: created.request_id.clone(),
            signing_token: created.token.clone(),
            created_at: now,
            updated_at: now,
            signed_at: None,
        };

        if let Err(e) = signature_repo::insert(self.db, &row) {
            error!(
                external_request_id = %created.request_id,
                error = %e,
                "Provider accepted a signature request that could not be recorded"
            );
            return Err(e.into());
        }

        info!(request_id = %row.id, "Signature request created");

        Ok(IssuedRequest {
            request_id: row.id,
            external_request_id: created.request_id,
            signer_ref: row.signer_ref,
            signer_name: row.signer_name,
            signer_email: row.signer_email,
            role: party.role,
            slot: party.slot,
            signing_token: created.token,
        })
    }
}
