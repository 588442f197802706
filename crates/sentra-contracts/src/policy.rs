//! Security policy, condition, and action definitions.
//!
//! A `SecurityPolicy` pairs an ordered condition chain with an ordered
//! action list. Policies are declarative data — evaluation lives in
//! `sentra-policy`, execution in `sentra-core`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier for a security policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyId(pub uuid::Uuid);

impl PolicyId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for PolicyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PolicyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Stable identifier for one action within a policy.
///
/// Part of the idempotency key: (policy, action, subject, fact).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub uuid::Uuid);

impl ActionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The scope a policy applies at.
///
/// Specificity is total: employee-scoped policies outrank department-scoped
/// policies, which outrank global ones, regardless of `priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyLevel {
    /// Applies to every subject. Must have no target.
    Global,
    /// Applies to subjects in the named department.
    Department,
    /// Applies to a single named employee.
    Employee,
}

impl PolicyLevel {
    /// Ordering weight used when sorting applicable policies.
    /// Higher is more specific.
    pub fn specificity(&self) -> u8 {
        match self {
            Self::Global => 0,
            Self::Department => 1,
            Self::Employee => 2,
        }
    }
}

impl std::fmt::Display for PolicyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Global => "global",
            Self::Department => "department",
            Self::Employee => "employee",
        };
        f.write_str(s)
    }
}

/// How a condition's own truth value combines with the running result of
/// the chain.
///
/// The first condition in a chain seeds the result; its operator is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    #[default]
    And,
    Or,
}

/// A single condition in a policy's left-to-right chain.
///
/// `field` and `operator` are deliberately plain strings rather than closed
/// enums: a condition referencing an unknown field or operator must fail
/// **closed** (evaluate to non-match, reported to the caller) instead of
/// being rejected wholesale at load time. Known fields: `risk_score`,
/// `violation_count`, `department`, `recent_violations`, `time_of_day`.
/// Known operators: `greater_than`, `less_than`, `equals`, `contains`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    /// The snapshot field this condition tests.
    pub field: String,
    /// Comparison operator name.
    pub operator: String,
    /// The value to compare against. Numeric comparisons coerce this to a
    /// number; string comparisons use it verbatim.
    pub value: serde_json::Value,
    /// Combines this condition's truth value with the running result.
    /// Ignored for the first condition in the chain.
    #[serde(default)]
    pub logical: LogicalOp,
    /// Evaluation sequence. Ties keep declaration order.
    #[serde(default)]
    pub order: u32,
}

/// The closed set of action types the dispatcher knows how to execute.
///
/// This is a wire contract: serialized names match the `type` column the
/// dashboard and CRUD layers read, and values outside this set fail
/// deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    CreateIncident,
    EnableMonitoring,
    EnableLogging,
    RestrictAccess,
    SendNotification,
    LogActivity,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CreateIncident => "create_incident",
            Self::EnableMonitoring => "enable_monitoring",
            Self::EnableLogging => "enable_logging",
            Self::RestrictAccess => "restrict_access",
            Self::SendNotification => "send_notification",
            Self::LogActivity => "log_activity",
        };
        f.write_str(s)
    }
}

/// One side-effecting action in a policy's ordered action list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Identifier for this action, unique within the catalog.
    #[serde(default)]
    pub id: ActionId,
    /// Which handler executes this action.
    pub kind: ActionType,
    /// Handler-specific parameters (severity, duration_hours, target, …).
    #[serde(default)]
    pub config: serde_json::Value,
    /// Execution sequence within the policy. Ties keep declaration order.
    #[serde(default)]
    pub order: u32,
    /// Seconds to wait before executing. Non-zero delays are queued on the
    /// deferred-execution facility; the dispatcher never sleeps.
    #[serde(default)]
    pub delay_secs: u64,
    /// Disabled actions are skipped entirely — no execution row is written.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// A declarative security policy.
///
/// Invariant (enforced at catalog load): `Global` policies have no
/// `target_id`; `Department` and `Employee` policies require one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityPolicy {
    #[serde(default)]
    pub id: PolicyId,
    /// Human-readable name used in logs, incidents, and audit rows.
    pub name: String,
    /// Scope of this policy.
    pub level: PolicyLevel,
    /// Department name or employee identifier, depending on `level`.
    /// `None` for global policies.
    #[serde(default)]
    pub target_id: Option<String>,
    /// Higher priority wins within the same specificity level.
    #[serde(default)]
    pub priority: i32,
    /// Inactive policies are never evaluated.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Ordered condition chain. An empty chain matches every subject.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Ordered action list.
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
    /// Creation time; breaks priority ties (earlier wins).
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}
