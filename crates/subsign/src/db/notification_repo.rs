//! Notification repository: in-app notifications queued for platform users.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw notification row from the database.
#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            message: row.get("message")?,
            link: row.get("link")?,
            is_read: row.get("is_read")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a new notification row.
pub fn insert(db: &Database, notification: &NotificationRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO notifications (id, user_id, title, message, link, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                notification.id,
                notification.user_id,
                notification.title,
                notification.message,
                notification.link,
                notification.is_read,
                notification.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Lists a user's notifications, newest first.
pub fn list_for_user(db: &Database, user_id: &str) -> Result<Vec<NotificationRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM notifications WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map(params![user_id], NotificationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Marks a notification read. Returns `false` if it does not exist.
pub fn mark_read(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(changed == 1)
    })
}
