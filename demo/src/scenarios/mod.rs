//! The four demo scenarios.

pub mod escalation;
pub mod expiry_sweep;
pub mod failing_action;
pub mod high_risk_alert;
