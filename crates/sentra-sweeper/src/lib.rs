//! # sentra-sweeper
//!
//! The expiry sweeper: the one writer allowed to deactivate time-bounded
//! settings whose `end_time` has passed.
//!
//! An external scheduler calls [`ExpirySweeper::sweep`] on a fixed
//! interval (the demo drives it manually). Each sweep queries the three
//! setting tables for expired, still-active rows, deactivates them one by
//! one, and leaves an activity entry per deactivation. Rows with no
//! `end_time` are indefinite and never touched.
//!
//! A sweep is idempotent: deactivated rows no longer match the expiry
//! query, so running twice at the same instant changes nothing the second
//! time. Failures on individual rows are collected and reported; they
//! never abort the rest of the sweep.

pub mod sweep;

pub use sweep::{ExpirySweeper, SweepReport};
