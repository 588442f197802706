//! Policy applicability and deterministic ordering.
//!
//! Given a subject's snapshot, `order_applicable` produces the exact
//! evaluation order the engine walks: employee-scoped policies first, then
//! department-scoped, then global; descending `priority` within a level;
//! creation order (then id) breaking remaining ties. The ordering is
//! deterministic so re-driving an event replays the same policy sequence.

use sentra_contracts::{event::RiskSnapshot, policy::SecurityPolicy};

/// Return true if `policy` is in scope for the subject described by
/// `snapshot`.
///
/// A department- or employee-level policy with a missing `target_id` never
/// applies. Catalog validation rejects such policies at load; hand-built
/// values can still reach here without one.
pub fn applies_to(policy: &SecurityPolicy, snapshot: &RiskSnapshot) -> bool {
    use sentra_contracts::policy::PolicyLevel::*;
    match policy.level {
        Global => true,
        Department => policy
            .target_id
            .as_deref()
            .is_some_and(|d| d == snapshot.department),
        Employee => policy
            .target_id
            .as_deref()
            .is_some_and(|e| e == snapshot.employee_id.0),
    }
}

/// Filter to active, in-scope policies and sort into evaluation order.
pub fn order_applicable<'a>(
    policies: &'a [SecurityPolicy],
    snapshot: &RiskSnapshot,
) -> Vec<&'a SecurityPolicy> {
    let mut applicable: Vec<&SecurityPolicy> = policies
        .iter()
        .filter(|p| p.is_active && applies_to(p, snapshot))
        .collect();

    applicable.sort_by(|a, b| {
        b.level
            .specificity()
            .cmp(&a.level.specificity())
            .then(b.priority.cmp(&a.priority))
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.0.cmp(&b.id.0))
    });

    applicable
}
