//! # sentra-incident
//!
//! The incident lifecycle state machine.
//!
//! Status only moves forward:
//!
//! ```text
//! Open ──> Investigating ──> Resolved ──> Closed
//!   └──────────────────────────^
//! ```
//!
//! and escalation only moves up (`Normal < High < Immediate < Critical`)
//! unless an explicit manual override lowers it. Every applied change
//! produces `IncidentUpdate` audit rows; stores persist them alongside the
//! mutated incident.
//!
//! This crate owns the transition rules only. Numbering, lookup, and
//! persistence live in `sentra-store`.

pub mod machine;

pub use machine::{begin_investigation, close, escalate, resolve};
