//! The top-level policy engine.
//!
//! `evaluate_policies` is the synchronous trigger entry point collaborators
//! call after persisting a new violation or risk change:
//!
//!   load applicable policies (specificity, then priority, then creation
//!   order) → evaluate each condition chain → dispatch actions for matches
//!   → return every execution row written.
//!
//! Policies are independent: one policy's action outcomes never
//! short-circuit the next policy. Handlers never call back into the
//! engine; any cascading effect (e.g. a created incident that should
//! itself be evaluated) must arrive as a new, separately dispatched
//! `TriggerEvent`, which bounds recursion structurally.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use sentra_contracts::{
    event::{RiskSnapshot, TriggerEvent},
    execution::PolicyExecution,
};
use sentra_policy::{evaluate, order_applicable, PolicyCatalog};

use crate::dispatch::{ActionDispatcher, DispatchReport};

/// The engine: a validated policy catalog plus a dispatcher.
pub struct PolicyEngine {
    catalog: PolicyCatalog,
    dispatcher: ActionDispatcher,
}

impl PolicyEngine {
    pub fn new(catalog: PolicyCatalog, dispatcher: ActionDispatcher) -> Self {
        Self { catalog, dispatcher }
    }

    /// Evaluate every applicable policy against `snapshot` for `event`.
    ///
    /// Returns all execution rows written during this call, across all
    /// matched policies — including `Pending` rows for delayed actions and
    /// `Skipped` rows for duplicate attempts. Safe to re-drive for the
    /// same event: idempotency keys turn repeats into `Skipped` rows.
    pub fn evaluate_policies(
        &self,
        event: &TriggerEvent,
        snapshot: &RiskSnapshot,
    ) -> Vec<PolicyExecution> {
        self.evaluate_policies_at(event, snapshot, Utc::now())
    }

    /// Clock-explicit variant of [`evaluate_policies`](Self::evaluate_policies).
    pub fn evaluate_policies_at(
        &self,
        event: &TriggerEvent,
        snapshot: &RiskSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<PolicyExecution> {
        debug!(
            employee = %event.employee_id,
            event_kind = %event.kind,
            risk_score = snapshot.risk_score,
            "evaluating policies"
        );

        let ordered = order_applicable(&self.catalog.policies, snapshot);
        let mut executions = Vec::new();

        for policy in ordered {
            let evaluation = evaluate(&policy.conditions, snapshot, now);
            for issue in &evaluation.issues {
                warn!(
                    policy = %policy.name,
                    field = %issue.field,
                    reason = %issue.reason,
                    "condition failed closed"
                );
            }

            if !evaluation.matched {
                debug!(policy = %policy.name, "no match");
                continue;
            }

            info!(
                policy = %policy.name,
                employee = %event.employee_id,
                "policy matched; dispatching actions"
            );

            let report = self.dispatcher.dispatch(policy, snapshot, event, now);
            for error in &report.errors {
                // Tracker-level failure on one action; remaining policies
                // and actions already continued past it.
                warn!(policy = %policy.name, error = %error, "dispatch error");
            }
            executions.extend(report.executions);
        }

        executions
    }

    /// Execute delayed actions that have come due. Driven by the external
    /// scheduler on a fixed interval.
    pub fn run_due(&self, now: DateTime<Utc>) -> DispatchReport {
        self.dispatcher.run_due(now)
    }

    /// Delayed actions still waiting on the timer queue.
    pub fn pending_delayed(&self) -> usize {
        self.dispatcher.pending_delayed()
    }
}
