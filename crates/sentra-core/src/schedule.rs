//! The deferred-execution facility for delayed actions.
//!
//! Actions with a non-zero `delay_secs` are not run inline: the dispatcher
//! records their `Pending` execution, pushes a `ScheduledAction` here, and
//! returns without blocking. An external scheduler drives
//! `ActionDispatcher::run_due` on a fixed interval (alongside the Expiry
//! Sweeper), which drains everything whose `due_at` has passed.
//!
//! The queue is a min-heap on `due_at` with an insertion sequence breaking
//! ties, so two actions due at the same instant run in the order they were
//! scheduled.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use sentra_contracts::execution::ExecutionId;

use crate::traits::ActionContext;

/// One delayed action awaiting its due time.
#[derive(Clone)]
pub struct ScheduledAction {
    pub due_at: DateTime<Utc>,
    /// The `Pending` execution row awaiting completion.
    pub execution_id: ExecutionId,
    pub ctx: Arc<ActionContext>,
}

/// Heap entry: ordering key only; the payload rides along.
struct QueueItem {
    due_at: DateTime<Utc>,
    seq: u64,
    action: ScheduledAction,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.due_at == other.due_at && self.seq == other.seq
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due_at.cmp(&other.due_at).then(self.seq.cmp(&other.seq))
    }
}

/// A timer queue of delayed actions.
///
/// Thread safety: all operations take an internal `Mutex`; producers
/// (dispatch calls) and the consumer (`run_due`) may run concurrently.
pub struct DelayQueue {
    state: Mutex<QueueState>,
}

struct QueueState {
    heap: BinaryHeap<Reverse<QueueItem>>,
    next_seq: u64,
}

impl DelayQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Schedule `action` for its `due_at`.
    pub fn push(&self, action: ScheduledAction) {
        let mut state = self.state.lock().expect("delay queue lock poisoned");
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Reverse(QueueItem {
            due_at: action.due_at,
            seq,
            action,
        }));
    }

    /// Remove and return every action with `due_at <= now`, soonest first.
    pub fn pop_due(&self, now: DateTime<Utc>) -> Vec<ScheduledAction> {
        let mut state = self.state.lock().expect("delay queue lock poisoned");
        let mut due = Vec::new();
        while let Some(Reverse(head)) = state.heap.peek() {
            if head.due_at > now {
                break;
            }
            let Reverse(item) = state.heap.pop().expect("peeked entry must pop");
            due.push(item.action);
        }
        due
    }

    /// Number of actions still waiting.
    pub fn len(&self) -> usize {
        self.state.lock().expect("delay queue lock poisoned").heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DelayQueue {
    fn default() -> Self {
        Self::new()
    }
}
