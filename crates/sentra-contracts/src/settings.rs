//! Time-bounded employee settings: monitoring, logging, access restriction.
//!
//! The three record kinds are structurally parallel: a subject, an active
//! window, provenance for how the setting came to exist, and kind-specific
//! configuration. `is_active = true` with `end_time` in the past is a
//! transient state the Expiry Sweeper corrects; the sweeper is the only
//! writer permitted to flip `is_active` for expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    event::{EmployeeId, ViolationId},
    policy::PolicyId,
};

/// Identifier shared by all three setting tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettingId(pub uuid::Uuid);

impl SettingId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SettingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SettingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Why a setting exists: the policy/violation that triggered it, or the
/// user who created it manually.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingProvenance {
    pub policy_id: Option<PolicyId>,
    pub violation_id: Option<ViolationId>,
    pub created_by: Option<String>,
}

/// The common view the Expiry Sweeper needs over every setting kind.
pub trait TimeBounded {
    fn setting_id(&self) -> SettingId;
    fn subject(&self) -> &EmployeeId;
    fn end_time(&self) -> Option<DateTime<Utc>>;
    fn is_active(&self) -> bool;

    /// True when the sweeper should deactivate this row at `now`.
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.end_time().is_some_and(|end| end <= now)
    }
}

/// Enhanced monitoring on a subject (screenshots, file access capture, …).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSetting {
    pub id: SettingId,
    pub employee_id: EmployeeId,
    pub start_time: DateTime<Utc>,
    /// `None` means the setting is indefinite; the sweeper never touches it.
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Why monitoring was enabled. `trigger_reason` is a deprecated input
    /// alias; it is accepted on deserialization and never written back.
    #[serde(alias = "trigger_reason")]
    pub reason: String,
    #[serde(flatten)]
    pub provenance: SettingProvenance,
    /// Kind-specific parameters (capture intervals, channels, …).
    #[serde(default)]
    pub config: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl TimeBounded for MonitoringSetting {
    fn setting_id(&self) -> SettingId {
        self.id
    }
    fn subject(&self) -> &EmployeeId {
        &self.employee_id
    }
    fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }
    fn is_active(&self) -> bool {
        self.is_active
    }
}

/// Detailed activity logging on a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSetting {
    pub id: SettingId,
    pub employee_id: EmployeeId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[serde(alias = "trigger_reason")]
    pub reason: String,
    #[serde(flatten)]
    pub provenance: SettingProvenance,
    /// Kind-specific parameters (log level, captured event classes, …).
    #[serde(default)]
    pub config: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl TimeBounded for LoggingSetting {
    fn setting_id(&self) -> SettingId {
        self.id
    }
    fn subject(&self) -> &EmployeeId {
        &self.employee_id
    }
    fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }
    fn is_active(&self) -> bool {
        self.is_active
    }
}

/// An access restriction placed on a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRestriction {
    pub id: SettingId,
    pub employee_id: EmployeeId,
    /// What is restricted (e.g. "file_share", "email_external", "vpn").
    pub restriction_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[serde(alias = "trigger_reason")]
    pub reason: String,
    /// The restriction is active immediately but awaits override review.
    pub pending_override_review: bool,
    /// Stamped when the sweeper expires the restriction or it is manually
    /// revoked.
    pub removed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub provenance: SettingProvenance,
    pub updated_at: DateTime<Utc>,
}

impl TimeBounded for AccessRestriction {
    fn setting_id(&self) -> SettingId {
        self.id
    }
    fn subject(&self) -> &EmployeeId {
        &self.employee_id
    }
    fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }
    fn is_active(&self) -> bool {
        self.is_active
    }
}

/// Parameters for enabling monitoring or logging; the store assigns
/// identity and timestamps. Used for both kinds — they differ only in
/// which table the upsert lands in.
#[derive(Debug, Clone)]
pub struct NewSetting {
    pub employee_id: EmployeeId,
    pub end_time: Option<DateTime<Utc>>,
    pub reason: String,
    pub provenance: SettingProvenance,
    pub config: serde_json::Value,
}

/// Parameters for inserting an access restriction.
#[derive(Debug, Clone)]
pub struct NewRestriction {
    pub employee_id: EmployeeId,
    pub restriction_type: String,
    pub end_time: Option<DateTime<Utc>>,
    pub reason: String,
    pub pending_override_review: bool,
    pub provenance: SettingProvenance,
}
