//! # sentra-store
//!
//! In-memory reference implementations of every persistence seam the
//! engine defines:
//!
//! - [`tracker::InMemoryExecutionTracker`] — the execution tracker
//!   (`ExecutionStore`)
//! - [`incidents::InMemoryIncidentStore`] — incidents, their update
//!   history, and `INC-<year>-<seq>` numbering (`IncidentSink` plus the
//!   manual transition surface)
//! - [`settings::InMemorySettingsStore`] — the three time-bounded setting
//!   tables (`SettingsSink` and `ExpiryStore`)
//! - [`notifications::InMemoryNotificationStore`] — notification rows
//!   (`NotificationSink`)
//! - [`activity::ChainedActivityLog`] — the SHA-256 hash-chained activity
//!   log (`ActivitySink`)
//!
//! Each store keeps its rows behind a `Mutex` and hands out clones, so
//! callers never observe half-applied writes.

pub mod activity;
pub mod incidents;
pub mod notifications;
pub mod settings;
pub mod tracker;

pub use activity::{verify_chain, ChainedActivityLog, ChainedEntry, GENESIS_HASH};
pub use incidents::InMemoryIncidentStore;
pub use notifications::InMemoryNotificationStore;
pub use settings::InMemorySettingsStore;
pub use tracker::InMemoryExecutionTracker;

// ── End-to-end scenario tests ─────────────────────────────────────────────────
