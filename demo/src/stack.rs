//! Shared wiring: a full Sentra stack over the in-memory stores.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use sentra_contracts::{
    error::SentraResult,
    event::{EmployeeId, RiskSnapshot, TriggerEvent, ViolationId},
    execution::PolicyExecution,
    policy::ActionType,
};
use sentra_core::{
    traits::{ActionHandler, SideEffects},
    ActionDispatcher, ActionRegistry, EngineConfig, PolicyEngine,
};
use sentra_policy::PolicyCatalog;
use sentra_store::{
    ChainedActivityLog, InMemoryExecutionTracker, InMemoryIncidentStore,
    InMemoryNotificationStore, InMemorySettingsStore,
};
use sentra_sweeper::ExpirySweeper;

/// Every component a scenario needs, wired over shared stores.
pub struct Stack {
    pub tracker: Arc<InMemoryExecutionTracker>,
    pub incidents: Arc<InMemoryIncidentStore>,
    pub settings: Arc<InMemorySettingsStore>,
    pub notifications: Arc<InMemoryNotificationStore>,
    pub activity: Arc<ChainedActivityLog>,
    pub engine: PolicyEngine,
    pub sweeper: ExpirySweeper,
}

impl Stack {
    /// Build a stack from a TOML policy catalog, optionally replacing
    /// built-in handlers.
    pub fn build(
        catalog_toml: &str,
        overrides: Vec<(ActionType, Arc<dyn ActionHandler>)>,
    ) -> SentraResult<Self> {
        let tracker = Arc::new(InMemoryExecutionTracker::new());
        let incidents = Arc::new(InMemoryIncidentStore::new());
        let settings = Arc::new(InMemorySettingsStore::new());
        let notifications = Arc::new(InMemoryNotificationStore::new());
        let activity = Arc::new(ChainedActivityLog::new());

        let mut registry = ActionRegistry::with_builtins(SideEffects {
            incidents: incidents.clone(),
            settings: settings.clone(),
            notifications: notifications.clone(),
            activity: activity.clone(),
        });
        for (kind, handler) in overrides {
            registry.register(kind, handler);
        }

        let dispatcher = ActionDispatcher::new(
            registry,
            tracker.clone(),
            EngineConfig {
                action_timeout: StdDuration::from_secs(10),
            },
        );
        let engine = PolicyEngine::new(PolicyCatalog::from_toml_str(catalog_toml)?, dispatcher);
        let sweeper = ExpirySweeper::new(settings.clone(), activity.clone());

        Ok(Self {
            tracker,
            incidents,
            settings,
            notifications,
            activity,
            engine,
            sweeper,
        })
    }
}

/// A violation event for the demo subject.
pub fn violation(employee: &str, kind: &str) -> TriggerEvent {
    TriggerEvent {
        violation_id: Some(ViolationId::new()),
        employee_id: EmployeeId::new(employee),
        kind: kind.to_string(),
        severity: None,
        occurred_at: chrono::Utc::now(),
    }
}

pub fn snapshot(employee: &str, risk_score: f64, violation_count: u32) -> RiskSnapshot {
    RiskSnapshot {
        employee_id: EmployeeId::new(employee),
        risk_score,
        violation_count,
        department: "engineering".to_string(),
        recent_violations: vec!["data_exfiltration".to_string()],
    }
}

/// Print execution rows as a table.
pub fn print_executions(executions: &[PolicyExecution]) {
    if executions.is_empty() {
        println!("  (no execution rows written)");
        return;
    }
    println!(
        "  {:<20} {:<10} {}",
        "action", "status", "detail"
    );
    for e in executions {
        let detail = e
            .error
            .clone()
            .or_else(|| e.skipped_duplicate_of.map(|id| format!("duplicate of {}", id)))
            .or_else(|| e.result.as_ref().map(|r| r.to_string()))
            .unwrap_or_default();
        println!("  {:<20} {:<10} {}", e.action_kind.to_string(), e.status.to_string(), detail);
    }
}
