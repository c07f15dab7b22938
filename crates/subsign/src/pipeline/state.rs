use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::db::{document_repo, subscription_repo, Database, DatabaseError};

use super::error::{PipelineError, PipelineWarning};

/// Marks the signable document as awaiting signature and stamps the
/// subscription's once-only timestamps.
///
/// The document transition must succeed. Each timestamp is attempted on its
/// own and a failure only adds a warning.
pub fn apply(
    db: &Database,
    document_id: &str,
    subscription_id: &str,
    at: DateTime<Utc>,
    warnings: &mut Vec<PipelineWarning>,
) -> Result<(), PipelineError> {
    document_repo::mark_pending_signature(db, document_id, at)?;

    stamp(
        "pack_generated_at",
        subscription_repo::mark_pack_generated(db, subscription_id, at),
        warnings,
    );
    stamp(
        "pack_sent_at",
        subscription_repo::mark_pack_sent(db, subscription_id, at),
        warnings,
    );
    Ok(())
}

fn stamp(
    field: &str,
    result: Result<bool, DatabaseError>,
    warnings: &mut Vec<PipelineWarning>,
) {
    match result {
        Ok(true) => debug!(field, "Timestamp set"),
        Ok(false) => debug!(field, "Timestamp already set"),
        Err(e) => {
            warn!(field, error = %e, "Failed to set subscription timestamp");
            warnings.push(PipelineWarning::TimestampUpdateFailed {
                field: field.to_string(),
                error: e.to_string(),
            });
        }
    }
}
