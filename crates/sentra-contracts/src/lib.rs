//! # sentra-contracts
//!
//! Shared types, schemas, and contracts for the Sentra policy execution
//! engine.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and error types. Serialized field
//! names and closed enums (notably `ExecutionStatus` and `ActionType`) are
//! the wire contract the dashboard and CRUD layers read.

pub mod activity;
pub mod error;
pub mod event;
pub mod execution;
pub mod incident;
pub mod notification;
pub mod policy;
pub mod settings;
