//! Durable policy execution records.
//!
//! One `PolicyExecution` row is written per (policy, action, subject, fact)
//! attempt. The row is the unit of idempotency and the audit surface other
//! components read; its `status` values are a wire contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    event::{EmployeeId, ViolationId},
    policy::{ActionId, PolicyId},
};

/// Identifier of a single execution row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub uuid::Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The closed execution status set: `pending -> {success, failed, skipped}`.
///
/// Serialized names are the exact strings the dashboard and CRUD layers
/// depend on. Any other value fails deserialization before it can reach
/// storage — the closed set is enforced by construction, not by a database
/// check constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Created before any side effect is attempted.
    Pending,
    /// The handler completed; `completed_at` and `result` are set.
    Success,
    /// The handler raised or timed out; `error` carries the payload.
    Failed,
    /// A duplicate attempt for a key that already has a recorded attempt;
    /// `skipped_duplicate_of` links the original.
    Skipped,
}

impl ExecutionStatus {
    /// Terminal statuses are never left. A row reaching one is frozen.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// The idempotency key: one logical action attempt.
///
/// Two events carrying the same key must not both execute the action; the
/// loser of the race records `Skipped` against the winner's row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionKey {
    pub policy_id: PolicyId,
    pub action_id: ActionId,
    pub employee_id: EmployeeId,
    /// The triggering fact, if the event carried one. Risk-update events
    /// have no violation; their key is (policy, action, subject, None).
    pub violation_id: Option<ViolationId>,
}

/// One durable record of an action attempt.
///
/// Created in `Pending` before any side effect is attempted; transitions
/// exactly once to a terminal status and is never reopened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyExecution {
    pub id: ExecutionId,
    pub key: ExecutionKey,
    /// The action's type, denormalized for the audit surface.
    pub action_kind: crate::policy::ActionType,
    pub status: ExecutionStatus,
    /// Set on transition to `Success` or `Failed`.
    pub completed_at: Option<DateTime<Utc>>,
    /// Handler result payload, set on `Success`.
    pub result: Option<serde_json::Value>,
    /// Captured error payload, set on `Failed`.
    pub error: Option<String>,
    /// For `Skipped` rows, the execution this attempt duplicated.
    pub skipped_duplicate_of: Option<ExecutionId>,
    pub created_at: DateTime<Utc>,
    /// Stamped by the store's post-write hook on every mutation.
    pub updated_at: DateTime<Utc>,
}

impl PolicyExecution {
    /// Build a fresh `Pending` row for `key`.
    pub fn pending(
        key: ExecutionKey,
        action_kind: crate::policy::ActionType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            key,
            action_kind,
            status: ExecutionStatus::Pending,
            completed_at: None,
            result: None,
            error: None,
            skipped_duplicate_of: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a `Skipped` row recording a duplicate attempt against
    /// `original`.
    pub fn skipped(
        key: ExecutionKey,
        action_kind: crate::policy::ActionType,
        original: ExecutionId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            key,
            action_kind,
            status: ExecutionStatus::Skipped,
            completed_at: Some(now),
            result: None,
            error: None,
            skipped_duplicate_of: Some(original),
            created_at: now,
            updated_at: now,
        }
    }
}
