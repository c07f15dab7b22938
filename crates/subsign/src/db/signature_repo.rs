//! Signature request repository.
//!
//! A document's active request set (`pending` or `signed`) is issued once.
//! Issuance is guarded by a row in `signature_claims`, taken inside an
//! IMMEDIATE transaction together with the active-request check, so two
//! concurrent callers cannot both proceed.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::{PositionSlot, SignatureStatus, SignerRole};

use super::{Database, DatabaseError};

/// A raw signature request row from the database.
#[derive(Debug, Clone)]
pub struct SignatureRequestRow {
    pub id: String,
    pub document_id: String,
    pub subscription_id: String,
    pub signer_role: SignerRole,
    /// Investor-member id, `primary_contact`, or a profile id for countersigners.
    pub signer_ref: String,
    pub signer_name: String,
    pub signer_email: String,
    pub position_slot: PositionSlot,
    pub status: SignatureStatus,
    pub external_request_id: String,
    pub signing_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub signed_at: Option<DateTime<Utc>>,
}

impl SignatureRequestRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            document_id: row.get("document_id")?,
            subscription_id: row.get("subscription_id")?,
            signer_role: row.get("signer_role")?,
            signer_ref: row.get("signer_ref")?,
            signer_name: row.get("signer_name")?,
            signer_email: row.get("signer_email")?,
            position_slot: row.get("position_slot")?,
            status: row.get("status")?,
            external_request_id: row.get("external_request_id")?,
            signing_token: row.get("signing_token")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            signed_at: row.get("signed_at")?,
        })
    }
}

/// The requests and claim that already occupy a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingRequests {
    pub pending_ids: Vec<String>,
    pub signed_ids: Vec<String>,
    /// When the document's issuance claim was taken, if one is held.
    pub claimed_at: Option<DateTime<Utc>>,
}

/// Result of trying to claim a document for issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The claim was taken; the caller may create requests.
    Claimed,
    /// Another invocation already holds the document.
    Held(ExistingRequests),
}

/// Inserts a new signature request row.
pub fn insert(db: &Database, request: &SignatureRequestRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO signature_requests (id, document_id, subscription_id, signer_role,
             signer_ref, signer_name, signer_email, position_slot, status,
             external_request_id, signing_token, created_at, updated_at, signed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                request.id,
                request.document_id,
                request.subscription_id,
                request.signer_role,
                request.signer_ref,
                request.signer_name,
                request.signer_email,
                request.position_slot,
                request.status,
                request.external_request_id,
                request.signing_token,
                request.created_at,
                request.updated_at,
                request.signed_at,
            ],
        )?;
        Ok(())
    })
}

fn query_for_document(
    conn: &Connection,
    document_id: &str,
    active_only: bool,
) -> Result<Vec<SignatureRequestRow>, DatabaseError> {
    let sql = if active_only {
        "SELECT * FROM signature_requests
         WHERE document_id = ?1 AND status IN ('pending', 'signed')
         ORDER BY created_at ASC, rowid ASC"
    } else {
        "SELECT * FROM signature_requests
         WHERE document_id = ?1
         ORDER BY created_at ASC, rowid ASC"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![document_id], SignatureRequestRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Lists every request for a document, in creation order.
pub fn list_for_document(
    db: &Database,
    document_id: &str,
) -> Result<Vec<SignatureRequestRow>, DatabaseError> {
    db.with_conn(|conn| query_for_document(conn, document_id, false))
}

/// Lists the active (`pending` or `signed`) requests for a document.
pub fn list_active_for_document(
    db: &Database,
    document_id: &str,
) -> Result<Vec<SignatureRequestRow>, DatabaseError> {
    db.with_conn(|conn| query_for_document(conn, document_id, true))
}

/// Atomically checks that a document has no active requests and no claim,
/// then records a claim for `claimed_by`.
pub fn claim_document(
    db: &Database,
    document_id: &str,
    claimed_by: Option<&str>,
    at: DateTime<Utc>,
) -> Result<ClaimOutcome, DatabaseError> {
    db.with_tx(|tx| {
        let active = query_for_document(tx, document_id, true)?;
        let claimed_at: Option<DateTime<Utc>> = tx
            .query_row(
                "SELECT claimed_at FROM signature_claims WHERE document_id = ?1",
                params![document_id],
                |r| r.get(0),
            )
            .optional()?;

        if !active.is_empty() || claimed_at.is_some() {
            let mut existing = ExistingRequests {
                claimed_at,
                ..Default::default()
            };
            for row in active {
                match row.status {
                    SignatureStatus::Signed => existing.signed_ids.push(row.id),
                    _ => existing.pending_ids.push(row.id),
                }
            }
            log::debug!(
                "Claim refused for document {}: {} pending, {} signed",
                document_id,
                existing.pending_ids.len(),
                existing.signed_ids.len()
            );
            return Ok(ClaimOutcome::Held(existing));
        }

        tx.execute(
            "INSERT INTO signature_claims (document_id, claimed_by, claimed_at)
             VALUES (?1, ?2, ?3)",
            params![document_id, claimed_by, at],
        )?;
        Ok(ClaimOutcome::Claimed)
    })
}

/// Drops a document's claim. Returns `true` if one was held.
pub fn release_claim(db: &Database, document_id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "DELETE FROM signature_claims WHERE document_id = ?1",
            params![document_id],
        )?;
        Ok(changed > 0)
    })
}

/// Cancels every pending request for a document. The claim is released when
/// no signed request remains, which allows the document to be issued again.
///
/// Returns the number of requests cancelled.
pub fn cancel_for_document(
    db: &Database,
    document_id: &str,
    at: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    db.with_tx(|tx| {
        let cancelled = tx.execute(
            "UPDATE signature_requests SET status = ?2, updated_at = ?3
             WHERE document_id = ?1 AND status = ?4",
            params![
                document_id,
                SignatureStatus::Cancelled,
                at,
                SignatureStatus::Pending
            ],
        )?;
        let signed: u32 = tx.query_row(
            "SELECT COUNT(*) FROM signature_requests WHERE document_id = ?1 AND status = ?2",
            params![document_id, SignatureStatus::Signed],
            |r| r.get(0),
        )?;
        if signed == 0 {
            tx.execute(
                "DELETE FROM signature_claims WHERE document_id = ?1",
                params![document_id],
            )?;
        }
        log::info!(
            "Cancelled {} pending signature request(s) for document {}",
            cancelled,
            document_id
        );
        Ok(cancelled)
    })
}

/// Marks a pending request as signed. Returns `false` if it was not pending.
pub fn mark_signed(db: &Database, id: &str, at: DateTime<Utc>) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE signature_requests SET status = ?2, signed_at = ?3, updated_at = ?3
             WHERE id = ?1 AND status = ?4",
            params![id, SignatureStatus::Signed, at, SignatureStatus::Pending],
        )?;
        Ok(changed == 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::document_repo::{self, tests::sample_document, tests::ts};

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute_batch(
                "INSERT INTO investors (id, legal_name, investor_type, created_at)
                 VALUES ('inv-1', 'Jane Doe', 'individual', '2026-01-01T00:00:00Z');
                 INSERT INTO deals (id, name, created_at)
                 VALUES ('deal-1', 'Fund IV', '2026-01-01T00:00:00Z');
                 INSERT INTO subscriptions (id, investor_id, deal_id, created_at, updated_at)
                 VALUES ('sub-1', 'inv-1', 'deal-1', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z');",
            )?;
            Ok(())
        })
        .unwrap();
        document_repo::insert(&db, &sample_document("doc-1", "a/pack.pdf", None)).unwrap();
        db
    }

    fn request(id: &str, slot: PositionSlot, status: SignatureStatus) -> SignatureRequestRow {
        SignatureRequestRow {
            id: id.to_string(),
            document_id: "doc-1".to_string(),
            subscription_id: "sub-1".to_string(),
            signer_role: SignerRole::Investor,
            signer_ref: "primary_contact".to_string(),
            signer_name: "Jane Doe".to_string(),
            signer_email: "jane@test".to_string(),
            position_slot: slot,
            status,
            external_request_id: format!("ext-{}", id),
            signing_token: format!("tok-{}", id),
            created_at: ts(1),
            updated_at: ts(1),
            signed_at: None,
        }
    }

    #[test]
    fn test_claim_is_exclusive() {
        let db = setup();
        assert_eq!(
            claim_document(&db, "doc-1", Some("op-1"), ts(2)).unwrap(),
            ClaimOutcome::Claimed
        );

        match claim_document(&db, "doc-1", Some("op-2"), ts(3)).unwrap() {
            ClaimOutcome::Held(existing) => {
                assert_eq!(existing.claimed_at, Some(ts(2)));
                assert!(existing.pending_ids.is_empty());
            }
            other => panic!("expected Held, got {:?}", other),
        }
    }

    #[test]
    fn test_claim_refused_when_active_requests_exist() {
        let db = setup();
        insert(&db, &request("r1", PositionSlot::Investor(1), SignatureStatus::Pending)).unwrap();
        insert(&db, &request("r2", PositionSlot::Countersigner, SignatureStatus::Signed)).unwrap();

        match claim_document(&db, "doc-1", None, ts(2)).unwrap() {
            ClaimOutcome::Held(existing) => {
                assert_eq!(existing.pending_ids, vec!["r1".to_string()]);
                assert_eq!(existing.signed_ids, vec!["r2".to_string()]);
                assert!(existing.claimed_at.is_none());
            }
            other => panic!("expected Held, got {:?}", other),
        }
    }

    #[test]
    fn test_release_claim_allows_reclaim() {
        let db = setup();
        claim_document(&db, "doc-1", None, ts(2)).unwrap();
        assert!(release_claim(&db, "doc-1").unwrap());
        assert!(!release_claim(&db, "doc-1").unwrap());
        assert_eq!(
            claim_document(&db, "doc-1", None, ts(3)).unwrap(),
            ClaimOutcome::Claimed
        );
    }

    #[test]
    fn test_active_slot_is_unique() {
        let db = setup();
        insert(&db, &request("r1", PositionSlot::Investor(1), SignatureStatus::Pending)).unwrap();
        let dup = insert(&db, &request("r2", PositionSlot::Investor(1), SignatureStatus::Pending));
        assert!(dup.is_err());

        // A cancelled row does not occupy the slot.
        insert(&db, &request("r3", PositionSlot::Investor(2), SignatureStatus::Cancelled))
            .unwrap();
        insert(&db, &request("r4", PositionSlot::Investor(2), SignatureStatus::Pending)).unwrap();
    }

    #[test]
    fn test_cancel_for_document_releases_claim() {
        let db = setup();
        claim_document(&db, "doc-1", None, ts(2)).unwrap();
        insert(&db, &request("r1", PositionSlot::Investor(1), SignatureStatus::Pending)).unwrap();
        insert(&db, &request("r2", PositionSlot::Countersigner, SignatureStatus::Pending)).unwrap();

        assert_eq!(cancel_for_document(&db, "doc-1", ts(5)).unwrap(), 2);
        assert!(list_active_for_document(&db, "doc-1").unwrap().is_empty());
        assert_eq!(list_for_document(&db, "doc-1").unwrap().len(), 2);
        assert_eq!(
            claim_document(&db, "doc-1", None, ts(6)).unwrap(),
            ClaimOutcome::Claimed
        );
    }

    #[test]
    fn test_cancel_keeps_claim_when_signed_requests_remain() {
        let db = setup();
        claim_document(&db, "doc-1", None, ts(2)).unwrap();
        insert(&db, &request("r1", PositionSlot::Investor(1), SignatureStatus::Pending)).unwrap();
        insert(&db, &request("r2", PositionSlot::Countersigner, SignatureStatus::Pending)).unwrap();
        assert!(mark_signed(&db, "r1", ts(3)).unwrap());
        assert!(!mark_signed(&db, "r1", ts(4)).unwrap());

        assert_eq!(cancel_for_document(&db, "doc-1", ts(5)).unwrap(), 1);
        let active = list_active_for_document(&db, "doc-1").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].status, SignatureStatus::Signed);
        assert_eq!(active[0].signed_at, Some(ts(3)));
        assert!(matches!(
            claim_document(&db, "doc-1", None, ts(6)).unwrap(),
            ClaimOutcome::Held(_)
        ));
    }
}
