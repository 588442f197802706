//! In-memory implementation of the execution tracker.
//!
//! `InMemoryExecutionTracker` is the reference implementation of
//! `ExecutionStore`. All rows live in a `Vec` behind a single `Mutex`; the
//! by-key index makes `begin` atomic per idempotency key, so two events
//! racing on the same key cannot both observe "no prior attempt". The
//! loser's attempt is recorded as a `Skipped` row linking the winner's.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::debug;

use sentra_contracts::{
    error::{SentraError, SentraResult},
    event::EmployeeId,
    execution::{ExecutionId, ExecutionKey, ExecutionStatus, PolicyExecution},
    policy::{ActionType, PolicyId},
};
use sentra_core::traits::{BeginOutcome, CompletionOutcome, ExecutionStore};

struct TrackerState {
    /// All rows, in insertion order. Skipped rows are appended like any
    /// other attempt; the audit surface shows every attempt made.
    rows: Vec<PolicyExecution>,
    /// Key of each non-skipped attempt to its row index.
    by_key: HashMap<ExecutionKey, usize>,
}

/// An in-memory, append-mostly execution tracker.
///
/// # Thread safety
///
/// Every operation takes the internal `Mutex`; the by-key check and the
/// row insert in `begin` happen under a single acquisition.
pub struct InMemoryExecutionTracker {
    state: Mutex<TrackerState>,
}

impl InMemoryExecutionTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState {
                rows: Vec::new(),
                by_key: HashMap::new(),
            }),
        }
    }

    /// Every row ever written, in insertion order.
    pub fn all(&self) -> Vec<PolicyExecution> {
        self.state
            .lock()
            .expect("tracker lock poisoned")
            .rows
            .clone()
    }
}

impl Default for InMemoryExecutionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionStore for InMemoryExecutionTracker {
    fn begin(
        &self,
        key: &ExecutionKey,
        kind: ActionType,
        now: DateTime<Utc>,
    ) -> SentraResult<BeginOutcome> {
        let mut state = self.state.lock().map_err(|e| SentraError::ExecutionStore {
            reason: format!("tracker lock poisoned: {}", e),
        })?;

        if let Some(&idx) = state.by_key.get(key) {
            let original = state.rows[idx].id;
            let skipped = PolicyExecution::skipped(key.clone(), kind, original, now);
            let skipped_id = skipped.id;
            debug!(original = %original, skipped = %skipped_id, "duplicate attempt recorded");
            state.rows.push(skipped);
            return Ok(BeginOutcome::Duplicate {
                original,
                skipped: skipped_id,
            });
        }

        let row = PolicyExecution::pending(key.clone(), kind, now);
        let id = row.id;
        let idx = state.rows.len();
        state.rows.push(row);
        state.by_key.insert(key.clone(), idx);
        Ok(BeginOutcome::Started(id))
    }

    fn complete(
        &self,
        id: ExecutionId,
        outcome: CompletionOutcome,
        now: DateTime<Utc>,
    ) -> SentraResult<PolicyExecution> {
        let mut state = self.state.lock().map_err(|e| SentraError::ExecutionStore {
            reason: format!("tracker lock poisoned: {}", e),
        })?;

        let row = state
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| SentraError::ExecutionStore {
                reason: format!("no execution row with id {}", id),
            })?;

        if row.status != ExecutionStatus::Pending {
            return Err(SentraError::InvalidExecutionTransition {
                from: row.status.to_string(),
                to: match outcome {
                    CompletionOutcome::Success(_) => ExecutionStatus::Success.to_string(),
                    CompletionOutcome::Failed(_) => ExecutionStatus::Failed.to_string(),
                },
            });
        }

        match outcome {
            CompletionOutcome::Success(value) => {
                row.status = ExecutionStatus::Success;
                row.result = Some(value);
            }
            CompletionOutcome::Failed(error) => {
                row.status = ExecutionStatus::Failed;
                row.error = Some(error);
            }
        }
        row.completed_at = Some(now);
        row.updated_at = now;
        Ok(row.clone())
    }

    fn get(&self, id: ExecutionId) -> Option<PolicyExecution> {
        self.state
            .lock()
            .expect("tracker lock poisoned")
            .rows
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    fn list_by_policy(&self, policy_id: PolicyId) -> Vec<PolicyExecution> {
        self.state
            .lock()
            .expect("tracker lock poisoned")
            .rows
            .iter()
            .filter(|r| r.key.policy_id == policy_id)
            .cloned()
            .collect()
    }

    fn list_by_subject(&self, employee_id: &EmployeeId) -> Vec<PolicyExecution> {
        self.state
            .lock()
            .expect("tracker lock poisoned")
            .rows
            .iter()
            .filter(|r| r.key.employee_id == *employee_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use sentra_contracts::{event::ViolationId, policy::ActionId};

    use super::*;

    fn key() -> ExecutionKey {
        ExecutionKey {
            policy_id: PolicyId::new(),
            action_id: ActionId::new(),
            employee_id: EmployeeId::new("emp-1"),
            violation_id: Some(ViolationId::new()),
        }
    }

    #[test]
    fn test_begin_then_complete_success() {
        let tracker = InMemoryExecutionTracker::new();
        let now = Utc::now();

        let outcome = tracker.begin(&key(), ActionType::CreateIncident, now).unwrap();
        let id = match outcome {
            BeginOutcome::Started(id) => id,
            BeginOutcome::Duplicate { .. } => panic!("fresh key must start"),
        };
        assert_eq!(tracker.get(id).unwrap().status, ExecutionStatus::Pending);

        let row = tracker
            .complete(id, CompletionOutcome::Success(json!({"ok": true})), now)
            .unwrap();
        assert_eq!(row.status, ExecutionStatus::Success);
        assert!(row.completed_at.is_some());
        assert_eq!(row.result, Some(json!({"ok": true})));
    }

    #[test]
    fn test_duplicate_key_yields_skipped_row() {
        let tracker = InMemoryExecutionTracker::new();
        let now = Utc::now();
        let key = key();

        let first = tracker.begin(&key, ActionType::SendNotification, now).unwrap();
        let original = match first {
            BeginOutcome::Started(id) => id,
            _ => panic!("fresh key must start"),
        };

        // Duplicate against a still-pending original.
        let second = tracker.begin(&key, ActionType::SendNotification, now).unwrap();
        match second {
            BeginOutcome::Duplicate { original: o, skipped } => {
                assert_eq!(o, original);
                let row = tracker.get(skipped).unwrap();
                assert_eq!(row.status, ExecutionStatus::Skipped);
                assert_eq!(row.skipped_duplicate_of, Some(original));
            }
            BeginOutcome::Started(_) => panic!("duplicate must not start"),
        }

        // Still a duplicate after the original lands terminal Failed.
        tracker
            .complete(original, CompletionOutcome::Failed("boom".to_string()), now)
            .unwrap();
        assert!(matches!(
            tracker.begin(&key, ActionType::SendNotification, now).unwrap(),
            BeginOutcome::Duplicate { .. }
        ));

        // Three attempts total on the audit surface.
        assert_eq!(tracker.all().len(), 3);
    }

    #[test]
    fn test_terminal_rows_are_frozen() {
        let tracker = InMemoryExecutionTracker::new();
        let now = Utc::now();

        let id = match tracker.begin(&key(), ActionType::LogActivity, now).unwrap() {
            BeginOutcome::Started(id) => id,
            _ => panic!(),
        };
        tracker
            .complete(id, CompletionOutcome::Success(json!({})), now)
            .unwrap();

        let err = tracker
            .complete(id, CompletionOutcome::Failed("late".to_string()), now)
            .unwrap_err();
        assert!(matches!(
            err,
            SentraError::InvalidExecutionTransition { .. }
        ));
        // The row kept its first, successful outcome.
        assert_eq!(tracker.get(id).unwrap().status, ExecutionStatus::Success);
    }

    #[test]
    fn test_list_by_subject_preserves_insertion_order() {
        let tracker = InMemoryExecutionTracker::new();
        let now = Utc::now();
        let employee = EmployeeId::new("emp-9");

        for _ in 0..3 {
            let mut k = key();
            k.employee_id = employee.clone();
            tracker.begin(&k, ActionType::LogActivity, now).unwrap();
        }
        // A row for someone else must not appear.
        tracker.begin(&key(), ActionType::LogActivity, now).unwrap();

        let rows = tracker.list_by_subject(&employee);
        assert_eq!(rows.len(), 3);
        let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
        let all_ids: Vec<_> = tracker
            .all()
            .into_iter()
            .filter(|r| r.key.employee_id == employee)
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, all_ids);
    }
}
