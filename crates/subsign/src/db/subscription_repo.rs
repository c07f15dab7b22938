//! Subscription repository: subscriptions, their deals, and the once-only
//! pack timestamps.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw deal row from the database.
#[derive(Debug, Clone)]
pub struct DealRow {
    pub id: String,
    pub name: String,
    pub vehicle_id: Option<String>,
    /// Referring intermediary organization, if any.
    pub introducer_org_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DealRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            vehicle_id: row.get("vehicle_id")?,
            introducer_org_id: row.get("introducer_org_id")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// A raw subscription row from the database.
#[derive(Debug, Clone)]
pub struct SubscriptionRow {
    pub id: String,
    pub investor_id: String,
    pub deal_id: String,
    pub vehicle_id: Option<String>,
    pub pack_generated_at: Option<DateTime<Utc>>,
    pub pack_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            investor_id: row.get("investor_id")?,
            deal_id: row.get("deal_id")?,
            vehicle_id: row.get("vehicle_id")?,
            pack_generated_at: row.get("pack_generated_at")?,
            pack_sent_at: row.get("pack_sent_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new deal row.
pub fn insert_deal(db: &Database, deal: &DealRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO deals (id, name, vehicle_id, introducer_org_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                deal.id,
                deal.name,
                deal.vehicle_id,
                deal.introducer_org_id,
                deal.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a deal by its ID.
pub fn find_deal(db: &Database, id: &str) -> Result<Option<DealRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM deals WHERE id = ?1",
                params![id],
                DealRow::from_row,
            )
            .optional()?)
    })
}

/// Inserts a new subscription row.
pub fn insert(db: &Database, sub: &SubscriptionRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO subscriptions (id, investor_id, deal_id, vehicle_id, pack_generated_at,
             pack_sent_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                sub.id,
                sub.investor_id,
                sub.deal_id,
                sub.vehicle_id,
                sub.pack_generated_at,
                sub.pack_sent_at,
                sub.created_at,
                sub.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a subscription by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<SubscriptionRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM subscriptions WHERE id = ?1",
                params![id],
                SubscriptionRow::from_row,
            )
            .optional()?)
    })
}

/// Sets `pack_generated_at` if it is still unset. Returns whether the
/// timestamp was written by this call.
pub fn mark_pack_generated(
    db: &Database,
    id: &str,
    at: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE subscriptions SET pack_generated_at = ?2, updated_at = ?2
             WHERE id = ?1 AND pack_generated_at IS NULL",
            params![id, at],
        )?;
        Ok(changed == 1)
    })
}

/// Sets `pack_sent_at` if it is still unset. Returns whether the timestamp
/// was written by this call.
pub fn mark_pack_sent(db: &Database, id: &str, at: DateTime<Utc>) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE subscriptions SET pack_sent_at = ?2, updated_at = ?2
             WHERE id = ?1 AND pack_sent_at IS NULL",
            params![id, at],
        )?;
        Ok(changed == 1)
    })
}
