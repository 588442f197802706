//! # sentra-core
//!
//! The execution half of the Sentra policy engine:
//!
//! - The trait seams (`ActionHandler`, `ExecutionStore`, side-effect sinks)
//! - The `ActionRegistry` mapping the closed action vocabulary to handlers
//! - The `ActionDispatcher` (idempotent bookkeeping, delayed-action queue,
//!   bounded handler timeouts, partial-failure isolation)
//! - The top-level `PolicyEngine`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sentra_core::{ActionDispatcher, ActionRegistry, EngineConfig, PolicyEngine};
//!
//! let registry = ActionRegistry::with_builtins(sinks);
//! let dispatcher = ActionDispatcher::new(registry, tracker, EngineConfig::default());
//! let engine = PolicyEngine::new(catalog, dispatcher);
//! let executions = engine.evaluate_policies(&event, &snapshot);
//! ```

pub mod dispatch;
pub mod engine;
pub mod handlers;
pub mod registry;
pub mod schedule;
pub mod traits;

pub use dispatch::{ActionDispatcher, DispatchReport, EngineConfig};
pub use engine::PolicyEngine;
pub use registry::ActionRegistry;
pub use schedule::{DelayQueue, ScheduledAction};

// ── Tests ─────────────────────────────────────────────────────────────────────
