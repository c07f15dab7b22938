//! Outbound notification channel.

use crate::db::notification_repo::{self, NotificationRow};
use crate::db::{Database, DatabaseError};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to store notification: {0}")]
    Database(#[from] DatabaseError),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

pub trait Notifier: Send + Sync {
    fn enqueue(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Stores notifications in the `notifications` table for the in-app inbox.
#[derive(Clone)]
pub struct DbNotifier {
    db: Database,
}

impl DbNotifier {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl Notifier for DbNotifier {
    fn enqueue(&self, notification: &Notification) -> Result<(), NotifyError> {
        let row = NotificationRow {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: notification.user_id.clone(),
            title: notification.title.clone(),
            message: notification.message.clone(),
            link: notification.link.clone(),
            is_read: false,
            created_at: crate::db::now(),
        };
        notification_repo::insert(&self.db, &row)?;
        Ok(())
    }
}
