//! System notification records.
//!
//! The engine only guarantees the notification row exists; delivery to an
//! external channel (email, chat) is an asynchronous, retryable concern
//! owned by a collaborator. Rows are write-once except for the
//! read/dismissed flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a notification row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub uuid::Uuid);

impl NotificationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NotificationTarget {
    /// A single user, by identifier.
    User(String),
    /// Every user holding the named role (e.g. "security_analyst").
    Role(String),
    /// Everyone.
    All,
}

/// Notification urgency, ordered `Low < Normal < High < Urgent`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A persisted system notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub target: NotificationTarget,
    pub priority: NotificationPriority,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub dismissed: bool,
    /// Notifications past this instant can be hidden by consumers.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for inserting a notification; the store assigns identity and
/// timestamps.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub target: NotificationTarget,
    pub priority: NotificationPriority,
    pub title: String,
    pub message: String,
    pub expires_at: Option<DateTime<Utc>>,
}
