use tracing::{debug, warn};

use crate::db::signature_repo::{self, ClaimOutcome};
use crate::db::Database;

use super::error::PipelineError;

/// Takes the issuance claim on `document_id`, or reports what already
/// occupies it.
pub fn claim(
    db: &Database,
    document_id: &str,
    claimed_by: Option<&str>,
) -> Result<(), PipelineError> {
    match signature_repo::claim_document(db, document_id, claimed_by, crate::db::now())? {
        ClaimOutcome::Claimed => {
            debug!(document_id, "Issuance claim taken");
            Ok(())
        }
        ClaimOutcome::Held(existing) => {
            let in_flight = existing.pending_ids.is_empty()
                && existing.signed_ids.is_empty()
                && existing.claimed_at.is_some();
            Err(PipelineError::Conflict {
                document_id: document_id.to_string(),
                pending_ids: existing.pending_ids,
                signed_ids: existing.signed_ids,
                in_flight,
            })
        }
    }
}

/// Drops the claim after a run that created no request, so the document can
/// be issued again. Failures are logged; the run's own error is what the
/// caller needs to see.
pub fn release(db: &Database, document_id: &str) {
    match signature_repo::release_claim(db, document_id) {
        Ok(true) => debug!(document_id, "Issuance claim released"),
        Ok(false) => {}
        Err(e) => warn!(document_id, error = %e, "Failed to release issuance claim"),
    }
}
