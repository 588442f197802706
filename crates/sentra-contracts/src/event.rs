//! Subject risk snapshots and triggering facts.
//!
//! These are the inputs the engine consumes from its collaborators: the
//! ingestion layer persists a violation or risk change, builds a
//! `TriggerEvent` plus the subject's current `RiskSnapshot`, and calls
//! `evaluate_policies`. The engine treats both as read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier for the employee a policy is evaluated against.
///
/// Employee identifiers come from the external HR/directory system and are
/// opaque strings to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

impl EmployeeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a persisted violation record in the collaborator's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViolationId(pub uuid::Uuid);

impl ViolationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ViolationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ViolationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A read-only snapshot of a subject's current risk posture.
///
/// Produced by the ingestion/scoring collaborators; the engine never
/// mutates it. The condition evaluator resolves condition fields against
/// these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSnapshot {
    /// The subject this snapshot describes.
    pub employee_id: EmployeeId,
    /// Current composite risk score (0.0–100.0 by convention).
    pub risk_score: f64,
    /// Total violations on record for this subject.
    pub violation_count: u32,
    /// The subject's department name, as the directory records it.
    pub department: String,
    /// Types of the subject's recent violations, most recent first.
    #[serde(default)]
    pub recent_violations: Vec<String>,
}

/// The fact that caused policy evaluation to run.
///
/// Either a newly persisted violation (`violation_id` set) or a risk-score
/// update (`violation_id` absent). The violation id participates in the
/// idempotency key, so two evaluations of the same fact never execute the
/// same action twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// The persisted violation behind this event, if any.
    pub violation_id: Option<ViolationId>,
    /// The subject the event concerns.
    pub employee_id: EmployeeId,
    /// Discriminant string (e.g. "data_exfiltration", "risk_update").
    pub kind: String,
    /// Severity the ingestion layer assigned to the fact, if any.
    pub severity: Option<crate::incident::IncidentSeverity>,
    /// Wall-clock time the fact occurred (UTC).
    pub occurred_at: DateTime<Utc>,
}
