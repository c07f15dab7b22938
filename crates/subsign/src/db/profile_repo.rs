//! Profile repository: platform user profiles, including the designated
//! countersigning approver.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw profile row from the database.
#[derive(Debug, Clone)]
pub struct ProfileRow {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub designated_signer: bool,
    pub created_at: DateTime<Utc>,
}

impl ProfileRow {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            display_name: row.get("display_name")?,
            email: row.get("email")?,
            designated_signer: row.get("designated_signer")?,
            created_at: row.get("created_at")?,
        })
    }

    /// The e-mail address, if present and non-blank.
    pub fn usable_email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Inserts a new profile row.
pub fn insert(db: &Database, profile: &ProfileRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO profiles (id, display_name, email, designated_signer, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                profile.id,
                profile.display_name,
                profile.email,
                profile.designated_signer,
                profile.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a profile by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<ProfileRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM profiles WHERE id = ?1",
                params![id],
                ProfileRow::from_row,
            )
            .optional()?)
    })
}

/// Finds the canonical platform approver: the earliest-created profile
/// flagged as designated signer that has a usable e-mail address.
pub fn find_designated_signer(db: &Database) -> Result<Option<ProfileRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM profiles
                 WHERE designated_signer = 1 AND email IS NOT NULL AND TRIM(email) != ''
                 ORDER BY created_at ASC, id ASC
                 LIMIT 1",
                [],
                ProfileRow::from_row,
            )
            .optional()?)
    })
}
