//! Core trait definitions for the Sentra execution pipeline.
//!
//! These traits define the engine's seams:
//!
//! - `ActionHandler`    — one side-effecting action implementation
//! - `ExecutionStore`   — the durable execution tracker (unit of idempotency)
//! - `IncidentSink`     — incident creation and escalation
//! - `SettingsSink`     — time-bounded setting upserts
//! - `ExpiryStore`      — the sweeper's view over the setting tables
//! - `NotificationSink` — notification row inserts
//! - `ActivitySink`     — activity log appends
//!
//! The dispatcher wires them together and owns the ordering and
//! partial-failure rules. Store implementations live in `sentra-store`;
//! the engine's own tables are mutated only through these traits, never by
//! request handlers directly.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use sentra_contracts::{
    activity::ActivityEntry,
    error::SentraResult,
    event::{EmployeeId, RiskSnapshot, TriggerEvent},
    execution::{ExecutionId, ExecutionKey, PolicyExecution},
    incident::{EscalationLevel, Incident, IncidentId, NewIncident},
    notification::{NewNotification, Notification},
    policy::{ActionSpec, ActionType, PolicyId, SecurityPolicy},
    settings::{
        AccessRestriction, LoggingSetting, MonitoringSetting, NewRestriction, NewSetting,
        SettingId,
    },
};

/// Everything a handler may read while executing one action.
///
/// Shared immutably (`Arc`) between the dispatcher and the worker thread
/// running the handler under a timeout.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub policy: SecurityPolicy,
    pub action: ActionSpec,
    pub snapshot: RiskSnapshot,
    pub event: TriggerEvent,
    /// The dispatch instant. Handlers derive end times from this, not from
    /// their own clock reads.
    pub now: DateTime<Utc>,
}

/// A side-effecting action implementation.
///
/// Handlers are invoked only after a `Pending` execution row exists for
/// the attempt, and must be safe to call from a worker thread. A returned
/// `Err` marks the execution `Failed`; sibling actions are unaffected.
/// Handlers must not call back into the policy engine — cascading effects
/// are deferred to new, separately dispatched events.
pub trait ActionHandler: Send + Sync {
    /// Execute the action and return a result payload for the execution row.
    fn execute(&self, ctx: &ActionContext) -> SentraResult<serde_json::Value>;
}

/// Outcome of `ExecutionStore::begin` for an idempotency key.
#[derive(Debug, Clone)]
pub enum BeginOutcome {
    /// No prior attempt exists; a `Pending` row was created.
    Started(ExecutionId),
    /// A prior attempt exists (pending or terminal success/failure); a
    /// `Skipped` row linking it was recorded instead.
    Duplicate {
        original: ExecutionId,
        skipped: ExecutionId,
    },
}

/// How a `Pending` execution finished.
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    Success(serde_json::Value),
    Failed(String),
}

/// The durable execution tracker.
///
/// Owns the `pending -> {success, failed, skipped}` state machine and the
/// single-writer guarantee per idempotency key: `begin` must be atomic per
/// key, so two concurrent events for the same key cannot both observe "no
/// prior attempt".
pub trait ExecutionStore: Send + Sync {
    /// Idempotent begin: create a `Pending` row for `key`, or record a
    /// `Skipped` duplicate if an attempt already exists.
    fn begin(
        &self,
        key: &ExecutionKey,
        kind: ActionType,
        now: DateTime<Utc>,
    ) -> SentraResult<BeginOutcome>;

    /// Transition a `Pending` row to `Success` or `Failed`, exactly once.
    fn complete(
        &self,
        id: ExecutionId,
        outcome: CompletionOutcome,
        now: DateTime<Utc>,
    ) -> SentraResult<PolicyExecution>;

    fn get(&self, id: ExecutionId) -> Option<PolicyExecution>;

    /// Audit surface: all attempts for one policy, in insertion order.
    fn list_by_policy(&self, policy_id: PolicyId) -> Vec<PolicyExecution>;

    /// Audit surface: all attempts concerning one subject, in insertion
    /// order.
    fn list_by_subject(&self, employee_id: &EmployeeId) -> Vec<PolicyExecution>;
}

/// Incident creation and escalation, as used by the `create_incident`
/// handler. Lifecycle transitions beyond escalation belong to the manual
/// surface in `sentra-store`.
pub trait IncidentSink: Send + Sync {
    /// Insert a new incident in `Open` status; the store assigns the
    /// `INC-<year>-<seq>` number.
    fn create_incident(&self, new: NewIncident, now: DateTime<Utc>) -> SentraResult<Incident>;

    /// The subject's open (Open/Investigating) incident, if any.
    fn find_open(&self, employee_id: &EmployeeId) -> Option<Incident>;

    /// Raise an open incident's escalation level. A target at or below the
    /// current level is a recorded no-op.
    fn escalate(
        &self,
        id: IncidentId,
        to: EscalationLevel,
        actor: &str,
        now: DateTime<Utc>,
    ) -> SentraResult<Incident>;
}

/// Upserts into the time-bounded setting tables.
pub trait SettingsSink: Send + Sync {
    /// Enable monitoring for a subject. An existing active row for the
    /// subject is extended/replaced rather than duplicated.
    fn upsert_monitoring(
        &self,
        new: NewSetting,
        now: DateTime<Utc>,
    ) -> SentraResult<MonitoringSetting>;

    /// Enable detailed logging for a subject; same upsert semantics.
    fn upsert_logging(&self, new: NewSetting, now: DateTime<Utc>) -> SentraResult<LoggingSetting>;

    /// Insert an access restriction. Restrictions stack; no upsert.
    fn insert_restriction(
        &self,
        new: NewRestriction,
        now: DateTime<Utc>,
    ) -> SentraResult<AccessRestriction>;
}

/// The Expiry Sweeper's read/deactivate surface over the setting tables.
///
/// The sweeper is the only writer permitted to flip `is_active` for expiry;
/// manual revocation goes through the store's own surface.
pub trait ExpiryStore: Send + Sync {
    fn expired_monitoring(&self, now: DateTime<Utc>) -> Vec<MonitoringSetting>;
    fn expired_logging(&self, now: DateTime<Utc>) -> Vec<LoggingSetting>;
    fn expired_restrictions(&self, now: DateTime<Utc>) -> Vec<AccessRestriction>;

    fn deactivate_monitoring(&self, id: SettingId, now: DateTime<Utc>) -> SentraResult<()>;
    fn deactivate_logging(&self, id: SettingId, now: DateTime<Utc>) -> SentraResult<()>;
    /// Also stamps `removed_at`.
    fn deactivate_restriction(&self, id: SettingId, now: DateTime<Utc>) -> SentraResult<()>;
}

/// Notification row inserts. Delivery to external channels is a
/// collaborator's concern; the engine only guarantees the row exists.
pub trait NotificationSink: Send + Sync {
    fn insert(&self, new: NewNotification, now: DateTime<Utc>) -> SentraResult<Notification>;
}

/// Append-only activity log.
pub trait ActivitySink: Send + Sync {
    fn record(&self, entry: ActivityEntry) -> SentraResult<()>;
}

/// Convenience bundle of the side-effect sinks the built-in handlers write
/// through. Cloning is cheap; all members are `Arc`s.
#[derive(Clone)]
pub struct SideEffects {
    pub incidents: Arc<dyn IncidentSink>,
    pub settings: Arc<dyn SettingsSink>,
    pub notifications: Arc<dyn NotificationSink>,
    pub activity: Arc<dyn ActivitySink>,
}
