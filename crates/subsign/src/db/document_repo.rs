//! Document repository: versioned subscription documents.
//!
//! Documents form a version chain: converting a document inserts a new row
//! pointing back at its predecessor (`previous_version_id`) and stamps the
//! predecessor with `superseded_by_id`. Rows are never rewritten into a
//! different artifact, and never deleted here.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::DocumentStatus;

use super::{Database, DatabaseError};

/// Longest chain `find_head` will follow before assuming corrupt data.
const MAX_CHAIN_LENGTH: usize = 32;

/// A raw document row from the database.
#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub id: String,
    pub subscription_id: String,
    pub deal_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub folder_id: Option<String>,
    pub name: String,
    /// Object-store key of the document bytes.
    pub file_key: String,
    pub mime_type: Option<String>,
    pub status: DocumentStatus,
    pub ready_for_signature: bool,
    pub previous_version_id: Option<String>,
    pub superseded_by_id: Option<String>,
    pub converted_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            subscription_id: row.get("subscription_id")?,
            deal_id: row.get("deal_id")?,
            vehicle_id: row.get("vehicle_id")?,
            folder_id: row.get("folder_id")?,
            name: row.get("name")?,
            file_key: row.get("file_key")?,
            mime_type: row.get("mime_type")?,
            status: row.get("status")?,
            ready_for_signature: row.get("ready_for_signature")?,
            previous_version_id: row.get("previous_version_id")?,
            superseded_by_id: row.get("superseded_by_id")?,
            converted_at: row.get("converted_at")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn is_superseded(&self) -> bool {
        self.superseded_by_id.is_some()
    }
}

fn insert_with(conn: &Connection, doc: &DocumentRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO documents (id, subscription_id, deal_id, vehicle_id, folder_id, name,
         file_key, mime_type, status, ready_for_signature, previous_version_id,
         superseded_by_id, converted_at, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            doc.id,
            doc.subscription_id,
            doc.deal_id,
            doc.vehicle_id,
            doc.folder_id,
            doc.name,
            doc.file_key,
            doc.mime_type,
            doc.status,
            doc.ready_for_signature,
            doc.previous_version_id,
            doc.superseded_by_id,
            doc.converted_at,
            doc.created_by,
            doc.created_at,
            doc.updated_at,
        ],
    )?;
    Ok(())
}

/// Inserts a new document row.
pub fn insert(db: &Database, doc: &DocumentRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_with(conn, doc))
}

/// Finds a document by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM documents WHERE id = ?1",
                params![id],
                DocumentRow::from_row,
            )
            .optional()?)
    })
}

/// Follows `superseded_by_id` links from `id` to the newest version.
/// Returns `None` if `id` itself does not exist.
pub fn find_head(db: &Database, id: &str) -> Result<Option<DocumentRow>, DatabaseError> {
    let Some(mut current) = find_by_id(db, id)? else {
        return Ok(None);
    };

    for _ in 0..MAX_CHAIN_LENGTH {
        let Some(next_id) = current.superseded_by_id.clone() else {
            return Ok(Some(current));
        };
        match find_by_id(db, &next_id)? {
            Some(next) => current = next,
            None => {
                return Err(DatabaseError::Conflict(format!(
                    "document '{}' is superseded by missing document '{}'",
                    current.id, next_id
                )))
            }
        }
    }

    Err(DatabaseError::Conflict(format!(
        "document chain starting at '{}' exceeds {} versions",
        id, MAX_CHAIN_LENGTH
    )))
}

/// Inserts `derived` and marks `source_id` as superseded by it, atomically.
///
/// Fails with [`DatabaseError::Conflict`] if the source was already
/// superseded, in which case nothing is written.
pub fn supersede(
    db: &Database,
    source_id: &str,
    derived: &DocumentRow,
    at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    db.with_tx(|tx| {
        insert_with(tx, derived)?;
        let changed = tx.execute(
            "UPDATE documents SET superseded_by_id = ?2, converted_at = ?3, updated_at = ?3
             WHERE id = ?1 AND superseded_by_id IS NULL",
            params![source_id, derived.id, at],
        )?;
        if changed != 1 {
            return Err(DatabaseError::Conflict(format!(
                "document '{}' is already superseded",
                source_id
            )));
        }
        Ok(())
    })
}

/// Reserves `source_id` for conversion. Returns `false` when the source is
/// already superseded or another invocation holds the reservation.
///
/// The reservation must be taken before anything is uploaded under the
/// derived key, since every conversion of a source writes to the same key.
pub fn claim_conversion(
    db: &Database,
    source_id: &str,
    claimed_by: Option<&str>,
    at: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    db.with_tx(|tx| {
        let superseded_by: Option<String> = tx.query_row(
            "SELECT superseded_by_id FROM documents WHERE id = ?1",
            params![source_id],
            |r| r.get(0),
        )?;
        if superseded_by.is_some() {
            log::debug!("Conversion refused for document {}: already superseded", source_id);
            return Ok(false);
        }

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO conversion_claims (document_id, claimed_by, claimed_at)
             VALUES (?1, ?2, ?3)",
            params![source_id, claimed_by, at],
        )?;
        if inserted == 0 {
            log::debug!("Conversion refused for document {}: in progress", source_id);
        }
        Ok(inserted == 1)
    })
}

/// Drops the conversion reservation on `source_id`. Returns `true` if one was held.
pub fn release_conversion(db: &Database, source_id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "DELETE FROM conversion_claims WHERE document_id = ?1",
            params![source_id],
        )?;
        Ok(changed > 0)
    })
}

/// Moves a document to `pending_signature` and flags it ready for signature.
pub fn mark_pending_signature(
    db: &Database,
    id: &str,
    at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE documents SET status = ?2, ready_for_signature = 1, updated_at = ?3
             WHERE id = ?1",
            params![id, DocumentStatus::PendingSignature, at],
        )?;
        if changed != 1 {
            return Err(DatabaseError::Sqlite(rusqlite::Error::QueryReturnedNoRows));
        }
        Ok(())
    })
}
