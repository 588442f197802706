//! The action registry: action type → handler.
//!
//! The action vocabulary is a fixed, closed set (`ActionType`), so the
//! registry is a small map rather than a plugin surface. Hosting code may
//! still replace a built-in handler (the demo swaps in a failing
//! notification handler to exercise partial-failure behavior).

use std::collections::HashMap;
use std::sync::Arc;

use sentra_contracts::policy::ActionType;

use crate::handlers::{
    CreateIncidentHandler, EnableLoggingHandler, EnableMonitoringHandler, LogActivityHandler,
    RestrictAccessHandler, SendNotificationHandler,
};
use crate::traits::{ActionHandler, SideEffects};

/// Maps each `ActionType` to its side-effecting handler.
pub struct ActionRegistry {
    handlers: HashMap<ActionType, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// An empty registry. Dispatching any action fails with
    /// `HandlerMissing` until handlers are registered.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry with the six built-in handlers wired to `sinks`.
    pub fn with_builtins(sinks: SideEffects) -> Self {
        let mut registry = Self::empty();
        registry.register(
            ActionType::CreateIncident,
            Arc::new(CreateIncidentHandler::new(sinks.incidents.clone())),
        );
        registry.register(
            ActionType::EnableMonitoring,
            Arc::new(EnableMonitoringHandler::new(sinks.settings.clone())),
        );
        registry.register(
            ActionType::EnableLogging,
            Arc::new(EnableLoggingHandler::new(sinks.settings.clone())),
        );
        registry.register(
            ActionType::RestrictAccess,
            Arc::new(RestrictAccessHandler::new(sinks.settings.clone())),
        );
        registry.register(
            ActionType::SendNotification,
            Arc::new(SendNotificationHandler::new(sinks.notifications.clone())),
        );
        registry.register(
            ActionType::LogActivity,
            Arc::new(LogActivityHandler::new(sinks.activity.clone())),
        );
        registry
    }

    /// Register `handler` for `kind`. Registering the same kind twice
    /// replaces the previous handler.
    pub fn register(&mut self, kind: ActionType, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(kind, handler);
    }

    pub fn get(&self, kind: ActionType) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&kind).cloned()
    }
}
