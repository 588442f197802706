//! The action dispatcher: ordered, idempotent, partial-failure-tolerant
//! execution of a matched policy's action list.
//!
//! For every enabled action, in ascending `order`:
//!
//! 1. `ExecutionStore::begin` the idempotency key. A duplicate attempt is
//!    recorded `Skipped` (linking the original) and the action does not run.
//! 2. A non-zero `delay_secs` pushes the pending execution onto the
//!    `DelayQueue`; the dispatcher never blocks the caller.
//! 3. Otherwise the registered handler runs under a bounded timeout on a
//!    worker thread, and the execution transitions to `Success` or
//!    `Failed`. One action's failure never aborts its siblings.
//!
//! There is no cross-action transaction: a failed action leaves sibling
//! successes in place, visible with its error payload on the audit surface.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use sentra_contracts::{
    error::{SentraError, SentraResult},
    event::{RiskSnapshot, TriggerEvent},
    execution::{ExecutionId, ExecutionKey, PolicyExecution},
    policy::SecurityPolicy,
};

use crate::registry::ActionRegistry;
use crate::schedule::{DelayQueue, ScheduledAction};
use crate::traits::{ActionContext, ActionHandler, BeginOutcome, CompletionOutcome, ExecutionStore};

/// Engine tuning, built once and passed in — never read ad hoc mid-dispatch.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound on a single handler invocation. A handler exceeding it is
    /// recorded `Failed` with a timeout payload; the worker thread is
    /// abandoned.
    pub action_timeout: StdDuration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            action_timeout: StdDuration::from_secs(30),
        }
    }
}

/// What one `dispatch` (or `run_due`) call produced.
///
/// `errors` carries tracker-level failures, i.e. actions whose attempt
/// could not even be recorded. Handler failures are not errors here; they
/// are `Failed` rows in `executions`.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub executions: Vec<PolicyExecution>,
    pub errors: Vec<SentraError>,
}

/// Orchestrates a matched policy's action list.
pub struct ActionDispatcher {
    registry: ActionRegistry,
    tracker: Arc<dyn ExecutionStore>,
    queue: DelayQueue,
    config: EngineConfig,
}

impl ActionDispatcher {
    pub fn new(registry: ActionRegistry, tracker: Arc<dyn ExecutionStore>, config: EngineConfig) -> Self {
        Self {
            registry,
            tracker,
            queue: DelayQueue::new(),
            config,
        }
    }

    /// Execute `policy`'s enabled actions for the matched subject.
    pub fn dispatch(
        &self,
        policy: &SecurityPolicy,
        snapshot: &RiskSnapshot,
        event: &TriggerEvent,
        now: DateTime<Utc>,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        // Catalog policies arrive pre-sorted; hand-built ones may not.
        let mut actions: Vec<_> = policy.actions.iter().filter(|a| a.enabled).collect();
        actions.sort_by_key(|a| a.order);

        for action in actions {
            let key = ExecutionKey {
                policy_id: policy.id,
                action_id: action.id,
                employee_id: event.employee_id.clone(),
                violation_id: event.violation_id,
            };

            let begin = match self.tracker.begin(&key, action.kind, now) {
                Ok(outcome) => outcome,
                Err(e) => {
                    // Cannot even record pending: fatal for this action only.
                    warn!(
                        policy = %policy.name,
                        action = %action.kind,
                        error = %e,
                        "execution tracker rejected begin; skipping action"
                    );
                    report.errors.push(e);
                    continue;
                }
            };

            match begin {
                BeginOutcome::Duplicate { original, skipped } => {
                    debug!(
                        policy = %policy.name,
                        action = %action.kind,
                        original = %original,
                        "duplicate attempt recorded skipped"
                    );
                    if let Some(row) = self.tracker.get(skipped) {
                        report.executions.push(row);
                    }
                }
                BeginOutcome::Started(id) => {
                    let ctx = Arc::new(ActionContext {
                        policy: policy.clone(),
                        action: (*action).clone(),
                        snapshot: snapshot.clone(),
                        event: event.clone(),
                        now,
                    });

                    if action.delay_secs > 0 {
                        // Catalog loading caps delays; a hand-built value
                        // too large for the clock parks the action as
                        // never-due rather than wrapping into the past.
                        let due_at = i64::try_from(action.delay_secs)
                            .ok()
                            .and_then(Duration::try_seconds)
                            .and_then(|delay| now.checked_add_signed(delay))
                            .unwrap_or(DateTime::<Utc>::MAX_UTC);
                        debug!(
                            policy = %policy.name,
                            action = %action.kind,
                            due_at = %due_at,
                            "action deferred"
                        );
                        self.queue.push(ScheduledAction {
                            due_at,
                            execution_id: id,
                            ctx,
                        });
                        if let Some(row) = self.tracker.get(id) {
                            report.executions.push(row);
                        }
                    } else {
                        match self.run_and_complete(id, ctx, now) {
                            Ok(row) => report.executions.push(row),
                            Err(e) => report.errors.push(e),
                        }
                    }
                }
            }
        }

        report
    }

    /// Drain and execute every delayed action whose due time has passed.
    ///
    /// Invoked on a fixed interval by the external scheduler. Each item
    /// runs under the same bounded timeout as inline actions; the context's
    /// clock is advanced to the execution instant so duration-based configs
    /// measure from when the action actually runs.
    pub fn run_due(&self, now: DateTime<Utc>) -> DispatchReport {
        let mut report = DispatchReport::default();
        for scheduled in self.queue.pop_due(now) {
            let mut ctx = (*scheduled.ctx).clone();
            ctx.now = now;
            match self.run_and_complete(scheduled.execution_id, Arc::new(ctx), now) {
                Ok(row) => report.executions.push(row),
                Err(e) => report.errors.push(e),
            }
        }
        report
    }

    /// Number of delayed actions still waiting.
    pub fn pending_delayed(&self) -> usize {
        self.queue.len()
    }

    /// Run the handler for an already-`Pending` execution and record the
    /// terminal status. Errors from this function are tracker failures;
    /// handler failures are folded into the `Failed` row.
    fn run_and_complete(
        &self,
        id: ExecutionId,
        ctx: Arc<ActionContext>,
        now: DateTime<Utc>,
    ) -> SentraResult<PolicyExecution> {
        let kind = ctx.action.kind;
        let outcome = match self.registry.get(kind) {
            None => {
                let err = SentraError::HandlerMissing {
                    action: kind.to_string(),
                };
                warn!(action = %kind, "no handler registered");
                CompletionOutcome::Failed(err.to_string())
            }
            Some(handler) => {
                match run_with_timeout(handler, ctx.clone(), self.config.action_timeout) {
                    Ok(value) => CompletionOutcome::Success(value),
                    Err(e) => {
                        warn!(
                            policy = %ctx.policy.name,
                            action = %kind,
                            error = %e,
                            "action handler failed"
                        );
                        CompletionOutcome::Failed(e.to_string())
                    }
                }
            }
        };
        self.tracker.complete(id, outcome, now)
    }
}

/// Invoke `handler` on a worker thread, bounded by `timeout`.
///
/// On timeout the worker is abandoned (its eventual result is discarded)
/// and a `HandlerTimeout` error is returned, which the dispatcher records
/// as a `Failed` execution.
fn run_with_timeout(
    handler: Arc<dyn ActionHandler>,
    ctx: Arc<ActionContext>,
    timeout: StdDuration,
) -> SentraResult<serde_json::Value> {
    let action = ctx.action.kind.to_string();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver may be gone after a timeout; a send error is fine.
        let _ = tx.send(handler.execute(&ctx));
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(SentraError::HandlerTimeout {
            action,
            timeout_secs: timeout.as_secs(),
        }),
    }
}
