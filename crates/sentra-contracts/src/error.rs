//! Error types for the Sentra policy execution engine.
//!
//! All fallible operations in the engine return `SentraResult<T>`.
//! Variants carry enough context to produce actionable execution records
//! and audit entries.

use thiserror::Error;

/// The unified error type for the Sentra engine.
#[derive(Debug, Error)]
pub enum SentraError {
    /// The execution tracker could not persist or update an execution row.
    ///
    /// Fatal for the affected action only; sibling actions and remaining
    /// policies are unaffected.
    #[error("execution store failure: {reason}")]
    ExecutionStore { reason: String },

    /// An attempt to move a `PolicyExecution` out of a terminal status, or
    /// otherwise violate the `pending -> {success, failed, skipped}` machine.
    #[error("invalid execution transition from '{from}' to '{to}'")]
    InvalidExecutionTransition { from: String, to: String },

    /// An incident lifecycle transition that the state machine forbids.
    #[error("incident state error: {reason}")]
    IncidentState { reason: String },

    /// An action handler reported a failure. Captured on the execution row;
    /// sibling actions continue.
    #[error("action handler '{action}' failed: {reason}")]
    HandlerFailed { action: String, reason: String },

    /// An action handler did not return within the configured timeout.
    /// Treated exactly like `HandlerFailed` by the dispatcher.
    #[error("action handler '{action}' timed out after {timeout_secs}s")]
    HandlerTimeout { action: String, timeout_secs: u64 },

    /// A sweep deactivation (or its activity write) did not return within
    /// the sweeper's per-row timeout. The sweep continues with the next row.
    #[error("sweep of setting '{setting}' timed out after {timeout_secs}s")]
    SweepTimeout { setting: String, timeout_secs: u64 },

    /// No handler is registered for the action's type.
    #[error("no handler registered for action type '{action}'")]
    HandlerMissing { action: String },

    /// A side-effect table (incidents, settings, notifications, activity)
    /// rejected a write.
    #[error("store write failed: {reason}")]
    StoreWrite { reason: String },

    /// A policy catalog or engine configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Convenience alias used throughout the Sentra crates.
pub type SentraResult<T> = Result<T, SentraError>;
