//! Investor repository: investors and their members (authorized representatives).

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::model::InvestorType;

use super::{Database, DatabaseError};

/// A raw investor row from the database.
#[derive(Debug, Clone)]
pub struct InvestorRow {
    pub id: String,
    pub legal_name: String,
    pub display_name: Option<String>,
    /// Legal type as recorded ("individual", "entity", "trust", ...).
    pub investor_type: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InvestorRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            legal_name: row.get("legal_name")?,
            display_name: row.get("display_name")?,
            investor_type: row.get("investor_type")?,
            email: row.get("email")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn kind(&self) -> InvestorType {
        InvestorType::from_legal_type(&self.investor_type)
    }

    /// Name used on signature blocks: the legal name, falling back to the
    /// display name when the legal name is blank.
    pub fn signing_name(&self) -> &str {
        let legal = self.legal_name.trim();
        if !legal.is_empty() {
            return legal;
        }
        self.display_name.as_deref().map(str::trim).unwrap_or("")
    }
}

/// A raw investor-member row from the database.
#[derive(Debug, Clone)]
pub struct MemberRow {
    pub id: String,
    pub investor_id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub is_signatory: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl MemberRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            investor_id: row.get("investor_id")?,
            full_name: row.get("full_name")?,
            email: row.get("email")?,
            is_signatory: row.get("is_signatory")?,
            is_active: row.get("is_active")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a new investor row.
pub fn insert_investor(db: &Database, investor: &InvestorRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO investors (id, legal_name, display_name, investor_type, email, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                investor.id,
                investor.legal_name,
                investor.display_name,
                investor.investor_type,
                investor.email,
                investor.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Inserts a new investor-member row.
pub fn insert_member(db: &Database, member: &MemberRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO investor_members (id, investor_id, full_name, email, is_signatory,
             is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                member.id,
                member.investor_id,
                member.full_name,
                member.email,
                member.is_signatory,
                member.is_active,
                member.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds an investor by its ID.
pub fn find_investor(db: &Database, id: &str) -> Result<Option<InvestorRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM investors WHERE id = ?1",
                params![id],
                InvestorRow::from_row,
            )
            .optional()?)
    })
}

/// Finds an investor member by its ID, regardless of investor or status.
pub fn find_member(db: &Database, id: &str) -> Result<Option<MemberRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM investor_members WHERE id = ?1",
                params![id],
                MemberRow::from_row,
            )
            .optional()?)
    })
}

/// Lists the active members flagged as authorized signatories, ordered by
/// creation time then id so that the result is stable across calls.
pub fn list_active_signatories(
    db: &Database,
    investor_id: &str,
) -> Result<Vec<MemberRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM investor_members
             WHERE investor_id = ?1 AND is_signatory = 1 AND is_active = 1
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![investor_id], MemberRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
