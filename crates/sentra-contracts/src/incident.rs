//! Incident records and their lifecycle vocabulary.
//!
//! Incidents are created as a side effect of `create_incident` actions (or
//! manually through the excluded CRUD layer). Lifecycle transitions are
//! applied by `sentra-incident`; this module only defines the data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    event::{EmployeeId, ViolationId},
    policy::PolicyId,
};

/// Identifier of an incident row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentId(pub uuid::Uuid);

impl IncidentId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for IncidentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Incident severity, ordered `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Incident lifecycle status. Transitions only move forward:
/// `Open -> Investigating -> Resolved -> Closed` (resolution may come
/// straight from `Open`). `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Investigating,
    Resolved,
    Closed,
}

impl IncidentStatus {
    /// Open and Investigating incidents can still receive escalations.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open | Self::Investigating)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Investigating => "investigating",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Escalation urgency, ordered `Normal < High < Immediate < Critical`.
///
/// Monotonic: never decreases without an explicit manual override.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    Normal,
    High,
    Immediate,
    Critical,
}

impl EscalationLevel {
    /// The escalation level a fresh incident of the given severity starts at.
    pub fn for_severity(severity: IncidentSeverity) -> Self {
        match severity {
            IncidentSeverity::Low | IncidentSeverity::Medium => Self::Normal,
            IncidentSeverity::High => Self::High,
            IncidentSeverity::Critical => Self::Immediate,
        }
    }
}

impl std::fmt::Display for EscalationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Normal => "normal",
            Self::High => "high",
            Self::Immediate => "immediate",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// A security incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    /// Human-readable number, `INC-<year>-<seq>`, assigned by the store.
    pub incident_number: String,
    pub title: String,
    pub description: String,
    pub severity: IncidentSeverity,
    pub status: IncidentStatus,
    pub escalation: EscalationLevel,
    /// The subject the incident concerns.
    pub employee_id: EmployeeId,
    /// The policy whose action created this incident, if any.
    pub policy_id: Option<PolicyId>,
    /// The triggering violation, if any.
    pub violation_id: Option<ViolationId>,
    /// Analyst/user the incident is assigned to.
    pub assigned_to: Option<String>,
    /// Required on transition to `Resolved`; set once.
    pub resolution_notes: Option<String>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Stamped when an escalation transition fires.
    pub escalated_at: Option<DateTime<Utc>>,
    /// The level the most recent escalation raised to.
    pub escalated_to: Option<EscalationLevel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating an incident; the store assigns identity,
/// number, and timestamps.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub title: String,
    pub description: String,
    pub severity: IncidentSeverity,
    /// Starting escalation level; defaults from severity when `None`.
    pub escalation: Option<EscalationLevel>,
    pub employee_id: EmployeeId,
    pub policy_id: Option<PolicyId>,
    pub violation_id: Option<ViolationId>,
}

/// One historical audit row recording a change applied to an incident.
///
/// Incident rows themselves are mutated in place by the state machine;
/// updates are the append-only history other components read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentUpdate {
    pub incident_id: IncidentId,
    /// Name of the field that changed (e.g. "status", "escalation").
    pub field: String,
    pub old_value: String,
    pub new_value: String,
    /// Who applied the change: a user id, or "policy-engine" for
    /// action-triggered transitions.
    pub actor: String,
    pub changed_at: DateTime<Utc>,
}
