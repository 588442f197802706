//! In-memory notification store.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use sentra_contracts::{
    error::{SentraError, SentraResult},
    notification::{NewNotification, Notification, NotificationId, NotificationTarget},
};
use sentra_core::traits::NotificationSink;

/// Append-mostly notification rows; only the read/dismissed flags mutate.
pub struct InMemoryNotificationStore {
    rows: Mutex<Vec<Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn all(&self) -> Vec<Notification> {
        self.rows
            .lock()
            .expect("notification store lock poisoned")
            .clone()
    }

    /// Unread, undismissed notifications addressed to `user_id` (directly,
    /// via one of `roles`, or broadcast).
    pub fn unread_for(&self, user_id: &str, roles: &[&str]) -> Vec<Notification> {
        self.rows
            .lock()
            .expect("notification store lock poisoned")
            .iter()
            .filter(|n| !n.read && !n.dismissed)
            .filter(|n| match &n.target {
                NotificationTarget::User(id) => id == user_id,
                NotificationTarget::Role(role) => roles.contains(&role.as_str()),
                NotificationTarget::All => true,
            })
            .cloned()
            .collect()
    }

    pub fn mark_read(&self, id: NotificationId, now: DateTime<Utc>) -> SentraResult<()> {
        self.set_flag(id, now, |n| n.read = true)
    }

    pub fn dismiss(&self, id: NotificationId, now: DateTime<Utc>) -> SentraResult<()> {
        self.set_flag(id, now, |n| n.dismissed = true)
    }

    fn set_flag<F: FnOnce(&mut Notification)>(
        &self,
        id: NotificationId,
        now: DateTime<Utc>,
        apply: F,
    ) -> SentraResult<()> {
        let mut rows = self.rows.lock().map_err(|e| SentraError::StoreWrite {
            reason: format!("notification store lock poisoned: {}", e),
        })?;
        let row = rows
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| SentraError::StoreWrite {
                reason: format!("no notification with id {}", id),
            })?;
        apply(row);
        row.updated_at = now;
        Ok(())
    }
}

impl Default for InMemoryNotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for InMemoryNotificationStore {
    fn insert(&self, new: NewNotification, now: DateTime<Utc>) -> SentraResult<Notification> {
        let mut rows = self.rows.lock().map_err(|e| SentraError::StoreWrite {
            reason: format!("notification store lock poisoned: {}", e),
        })?;
        let notification = Notification {
            id: NotificationId::new(),
            target: new.target,
            priority: new.priority,
            title: new.title,
            message: new.message,
            read: false,
            dismissed: false,
            expires_at: new.expires_at,
            created_at: now,
            updated_at: now,
        };
        rows.push(notification.clone());
        Ok(notification)
    }
}
