//! Activity log entries.
//!
//! Every automated action the engine takes on a subject's behalf leaves an
//! activity entry: `log_activity` actions, setting upserts, and sweeper
//! deactivations all write here. The store wraps entries in a hash chain;
//! this module only defines the entry body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::EmployeeId;

/// A single activity log entry, before chaining.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// The subject the activity concerns.
    pub employee_id: EmployeeId,
    /// Entry class (e.g. "policy_action", "monitoring_expired").
    pub category: String,
    /// Human-readable summary.
    pub message: String,
    /// Structured detail payload.
    #[serde(default)]
    pub details: serde_json::Value,
    /// Risk score snapshot at the time of the activity, when known.
    pub risk_score: Option<f64>,
    /// Contributing risk factors captured alongside the score.
    #[serde(default)]
    pub risk_factors: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}
