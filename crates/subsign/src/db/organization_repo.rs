//! Organization repository: arrangers, introducers and their users.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::profile_repo::ProfileRow;
use super::{Database, DatabaseError};

/// A raw organization row from the database.
#[derive(Debug, Clone)]
pub struct OrganizationRow {
    pub id: String,
    pub name: String,
    /// Free-form organization kind (e.g. "arranger", "introducer").
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

impl OrganizationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            kind: row.get("kind")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a new organization row.
pub fn insert(db: &Database, org: &OrganizationRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO organizations (id, name, kind, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![org.id, org.name, org.kind, org.created_at],
        )?;
        Ok(())
    })
}

/// Associates a profile with an organization.
pub fn add_user(
    db: &Database,
    organization_id: &str,
    profile_id: &str,
    is_primary: bool,
    created_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO organization_users (organization_id, profile_id, is_primary, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![organization_id, profile_id, is_primary, created_at],
        )?;
        Ok(())
    })
}

/// Finds an organization by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<OrganizationRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM organizations WHERE id = ?1",
                params![id],
                OrganizationRow::from_row,
            )
            .optional()?)
    })
}

/// Returns the primary user of an organization. When the data holds several
/// primary users, the earliest association wins.
pub fn find_primary_user(
    db: &Database,
    organization_id: &str,
) -> Result<Option<ProfileRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT p.* FROM organization_users ou
                 JOIN profiles p ON p.id = ou.profile_id
                 WHERE ou.organization_id = ?1 AND ou.is_primary = 1
                 ORDER BY ou.created_at ASC, p.id ASC
                 LIMIT 1",
                params![organization_id],
                ProfileRow::from_row,
            )
            .optional()?)
    })
}

/// Lists every user associated with an organization, in association order.
pub fn list_users(db: &Database, organization_id: &str) -> Result<Vec<ProfileRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT p.* FROM organization_users ou
             JOIN profiles p ON p.id = ou.profile_id
             WHERE ou.organization_id = ?1
             ORDER BY ou.created_at ASC, p.id ASC",
        )?;
        let rows = stmt
            .query_map(params![organization_id], ProfileRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
