//! # sentra-policy
//!
//! Condition evaluation and policy selection for the Sentra engine.
//!
//! ## Overview
//!
//! This crate is the pure half of policy handling:
//!
//! - [`evaluator::evaluate`] folds a policy's condition chain over a
//!   subject's risk snapshot — deterministic, total, fail-closed.
//! - [`select::order_applicable`] filters and orders the policies an event
//!   must walk (specificity, then priority, then creation order).
//! - [`catalog::PolicyCatalog`] loads declarative TOML policy documents and
//!   validates structural invariants at load time.
//!
//! Nothing here performs I/O at evaluation time or touches the clock; the
//! caller supplies `now`.

pub mod catalog;
pub mod evaluator;
pub mod select;

pub use catalog::{PolicyCatalog, MAX_ACTION_DELAY_SECS};
pub use evaluator::{evaluate, EvalIssue, Evaluation};
pub use select::{applies_to, order_applicable};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    use sentra_contracts::{
        error::SentraError,
        event::{EmployeeId, RiskSnapshot},
        policy::{Condition, LogicalOp, PolicyLevel, SecurityPolicy},
    };

    use crate::{evaluate, order_applicable, PolicyCatalog};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn snapshot(risk_score: f64, violation_count: u32, department: &str) -> RiskSnapshot {
        RiskSnapshot {
            employee_id: EmployeeId::new("emp-1"),
            risk_score,
            violation_count,
            department: department.to_string(),
            recent_violations: vec!["data_exfiltration".to_string(), "usb_storage".to_string()],
        }
    }

    fn cond(field: &str, operator: &str, value: serde_json::Value, logical: LogicalOp) -> Condition {
        Condition {
            field: field.to_string(),
            operator: operator.to_string(),
            value,
            logical,
            order: 0,
        }
    }

    // ── 1. basic comparisons ──────────────────────────────────────────────────

    #[test]
    fn test_numeric_greater_than() {
        let conditions = [cond("risk_score", "greater_than", json!(90), LogicalOp::And)];
        let now = Utc::now();
        assert!(evaluate(&conditions, &snapshot(95.0, 0, "eng"), now).matched);
        assert!(!evaluate(&conditions, &snapshot(80.0, 0, "eng"), now).matched);
        // Boundary: strictly greater.
        assert!(!evaluate(&conditions, &snapshot(90.0, 0, "eng"), now).matched);
    }

    #[test]
    fn test_numeric_less_than_and_equals() {
        let now = Utc::now();
        let less = [cond("violation_count", "less_than", json!(3), LogicalOp::And)];
        assert!(evaluate(&less, &snapshot(0.0, 2, "eng"), now).matched);
        assert!(!evaluate(&less, &snapshot(0.0, 3, "eng"), now).matched);

        let eq = [cond("violation_count", "equals", json!(3), LogicalOp::And)];
        assert!(evaluate(&eq, &snapshot(0.0, 3, "eng"), now).matched);

        // Numeric coercion: a string-typed value still compares numerically.
        let eq_str = [cond("risk_score", "equals", json!("75"), LogicalOp::And)];
        assert!(evaluate(&eq_str, &snapshot(75.0, 0, "eng"), now).matched);
    }

    #[test]
    fn test_string_equals_is_case_sensitive() {
        let now = Utc::now();
        let conditions = [cond("department", "equals", json!("Finance"), LogicalOp::And)];
        assert!(evaluate(&conditions, &snapshot(0.0, 0, "Finance"), now).matched);
        assert!(!evaluate(&conditions, &snapshot(0.0, 0, "finance"), now).matched);
    }

    #[test]
    fn test_contains_is_substring() {
        let now = Utc::now();
        let conditions = [cond(
            "recent_violations",
            "contains",
            json!("exfiltration"),
            LogicalOp::And,
        )];
        assert!(evaluate(&conditions, &snapshot(0.0, 0, "eng"), now).matched);

        let conditions = [cond(
            "recent_violations",
            "contains",
            json!("badge_tailgating"),
            LogicalOp::And,
        )];
        assert!(!evaluate(&conditions, &snapshot(0.0, 0, "eng"), now).matched);
    }

    #[test]
    fn test_time_of_day_uses_supplied_clock() {
        let at_2am = Utc.with_ymd_and_hms(2026, 3, 14, 2, 30, 0).unwrap();
        let at_2pm = Utc.with_ymd_and_hms(2026, 3, 14, 14, 30, 0).unwrap();
        let conditions = [cond("time_of_day", "less_than", json!(6), LogicalOp::And)];
        assert!(evaluate(&conditions, &snapshot(0.0, 0, "eng"), at_2am).matched);
        assert!(!evaluate(&conditions, &snapshot(0.0, 0, "eng"), at_2pm).matched);
    }

    // ── 2. chain folding ──────────────────────────────────────────────────────

    /// The chain is a strict left-to-right fold with no precedence:
    /// `A or B and C` evaluates as `(A or B) and C`.
    #[test]
    fn test_sequential_fold_has_no_precedence() {
        let now = Utc::now();
        let mut conditions = vec![
            cond("risk_score", "greater_than", json!(90), LogicalOp::And), // A: false
            cond("violation_count", "greater_than", json!(0), LogicalOp::Or), // B: true
            cond("department", "equals", json!("hr"), LogicalOp::And),     // C: false
        ];
        for (i, c) in conditions.iter_mut().enumerate() {
            c.order = i as u32;
        }

        // (false or true) and false == false. Standard precedence
        // (false or (true and false)) would agree here, so also check a
        // distinguishing shape below.
        assert!(!evaluate(&conditions, &snapshot(50.0, 2, "eng"), now).matched);

        // A=true, B=false, C=false: fold gives (true or false) and false = false;
        // `A or (B and C)` would give true. The fold semantics must win.
        let snap = snapshot(95.0, 0, "eng");
        let mut conditions = vec![
            cond("risk_score", "greater_than", json!(90), LogicalOp::And),
            cond("violation_count", "greater_than", json!(5), LogicalOp::Or),
            cond("department", "equals", json!("hr"), LogicalOp::And),
        ];
        for (i, c) in conditions.iter_mut().enumerate() {
            c.order = i as u32;
        }
        assert!(!evaluate(&conditions, &snap, now).matched);
    }

    /// The first condition seeds the result; its logical operator is ignored.
    #[test]
    fn test_first_condition_operator_ignored() {
        let now = Utc::now();
        let conditions = [cond("risk_score", "greater_than", json!(90), LogicalOp::Or)];
        assert!(!evaluate(&conditions, &snapshot(10.0, 0, "eng"), now).matched);
    }

    /// An empty chain matches everything.
    #[test]
    fn test_empty_chain_matches() {
        let out = evaluate(&[], &snapshot(0.0, 0, "eng"), Utc::now());
        assert!(out.matched);
        assert!(out.issues.is_empty());
    }

    /// Same inputs, same output — evaluation is deterministic.
    #[test]
    fn test_evaluation_deterministic() {
        let now = Utc::now();
        let conditions = [
            cond("risk_score", "greater_than", json!(50), LogicalOp::And),
            cond("department", "equals", json!("eng"), LogicalOp::And),
        ];
        let snap = snapshot(60.0, 1, "eng");
        let first = evaluate(&conditions, &snap, now).matched;
        for _ in 0..10 {
            assert_eq!(evaluate(&conditions, &snap, now).matched, first);
        }
    }

    // ── 3. fail-closed behavior ───────────────────────────────────────────────

    #[test]
    fn test_unknown_field_fails_closed_with_issue() {
        let now = Utc::now();
        let conditions = [cond("keystroke_rate", "greater_than", json!(10), LogicalOp::And)];
        let out = evaluate(&conditions, &snapshot(99.0, 9, "eng"), now);
        assert!(!out.matched);
        assert_eq!(out.issues.len(), 1);
        assert!(out.issues[0].reason.contains("unknown condition field"));
    }

    #[test]
    fn test_unknown_operator_fails_closed_with_issue() {
        let now = Utc::now();
        let conditions = [cond("risk_score", "matches_regex", json!("9.*"), LogicalOp::And)];
        let out = evaluate(&conditions, &snapshot(99.0, 0, "eng"), now);
        assert!(!out.matched);
        assert!(out.issues[0].reason.contains("unknown operator"));
    }

    #[test]
    fn test_non_coercible_value_fails_closed() {
        let now = Utc::now();
        let conditions = [cond("risk_score", "greater_than", json!("very high"), LogicalOp::And)];
        let out = evaluate(&conditions, &snapshot(99.0, 0, "eng"), now);
        assert!(!out.matched);
        assert!(out.issues[0].reason.contains("not numeric"));
    }

    /// A failed condition still participates in the fold: with `or` it can
    /// be rescued by an earlier true result.
    #[test]
    fn test_failed_condition_folds_as_false() {
        let now = Utc::now();
        let mut conditions = vec![
            cond("risk_score", "greater_than", json!(50), LogicalOp::And), // true
            cond("bogus_field", "equals", json!(1), LogicalOp::Or),        // issue -> false
        ];
        conditions[1].order = 1;
        let out = evaluate(&conditions, &snapshot(80.0, 0, "eng"), now);
        assert!(out.matched, "true or false == true");
        assert_eq!(out.issues.len(), 1);
    }

    // ── 4. applicability and ordering ─────────────────────────────────────────

    fn policy(name: &str, level: PolicyLevel, target: Option<&str>, priority: i32) -> SecurityPolicy {
        SecurityPolicy {
            id: Default::default(),
            name: name.to_string(),
            level,
            target_id: target.map(String::from),
            priority,
            is_active: true,
            conditions: vec![],
            actions: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_applicability_by_level_and_target() {
        let snap = snapshot(0.0, 0, "finance");
        let policies = vec![
            policy("global", PolicyLevel::Global, None, 0),
            policy("fin", PolicyLevel::Department, Some("finance"), 0),
            policy("eng", PolicyLevel::Department, Some("engineering"), 0),
            policy("me", PolicyLevel::Employee, Some("emp-1"), 0),
            policy("other", PolicyLevel::Employee, Some("emp-2"), 0),
        ];
        let names: Vec<&str> = order_applicable(&policies, &snap)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["me", "fin", "global"]);
    }

    #[test]
    fn test_ordering_specificity_beats_priority() {
        let snap = snapshot(0.0, 0, "finance");
        let policies = vec![
            policy("global-hot", PolicyLevel::Global, None, 1000),
            policy("emp-cold", PolicyLevel::Employee, Some("emp-1"), 1),
        ];
        let names: Vec<&str> = order_applicable(&policies, &snap)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["emp-cold", "global-hot"]);
    }

    #[test]
    fn test_ordering_priority_then_creation_order() {
        let snap = snapshot(0.0, 0, "eng");
        let mut early = policy("early", PolicyLevel::Global, None, 50);
        early.created_at = Utc::now() - Duration::hours(1);
        let late = policy("late", PolicyLevel::Global, None, 50);
        let hot = policy("hot", PolicyLevel::Global, None, 75);

        let policies = vec![late.clone(), hot.clone(), early.clone()];
        let names: Vec<&str> = order_applicable(&policies, &snap)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["hot", "early", "late"]);
    }

    #[test]
    fn test_inactive_policies_are_never_selected() {
        let snap = snapshot(0.0, 0, "eng");
        let mut p = policy("dormant", PolicyLevel::Global, None, 10);
        p.is_active = false;
        assert!(order_applicable(&[p], &snap).is_empty());
    }

    // ── 5. catalog loading ────────────────────────────────────────────────────

    #[test]
    fn test_catalog_loads_and_sorts_actions() {
        let toml = r#"
            [[policies]]
            name = "High Risk Alert"
            level = "global"
            priority = 75

            [[policies.conditions]]
            field = "risk_score"
            operator = "greater_than"
            value = 90.0

            [[policies.actions]]
            kind = "send_notification"
            order = 2

            [[policies.actions]]
            kind = "create_incident"
            order = 1
            [policies.actions.config]
            severity = "high"
        "#;

        let catalog = PolicyCatalog::from_toml_str(toml).unwrap();
        assert_eq!(catalog.policies.len(), 1);
        let p = &catalog.policies[0];
        assert_eq!(p.name, "High Risk Alert");
        assert_eq!(p.priority, 75);
        assert!(p.is_active);
        // Actions come back sorted by order.
        assert_eq!(p.actions[0].order, 1);
        assert_eq!(p.actions[1].order, 2);
        assert_eq!(p.actions[0].config["severity"], json!("high"));
    }

    #[test]
    fn test_catalog_rejects_global_with_target() {
        let toml = r#"
            [[policies]]
            name = "bad"
            level = "global"
            target_id = "finance"
        "#;
        match PolicyCatalog::from_toml_str(toml) {
            Err(SentraError::Config { reason }) => {
                assert!(reason.contains("global"), "unexpected reason: {reason}");
            }
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_catalog_rejects_scoped_policy_without_target() {
        let toml = r#"
            [[policies]]
            name = "bad"
            level = "department"
        "#;
        assert!(matches!(
            PolicyCatalog::from_toml_str(toml),
            Err(SentraError::Config { .. })
        ));
    }

    #[test]
    fn test_catalog_rejects_duplicate_action_orders() {
        let toml = r#"
            [[policies]]
            name = "bad"
            level = "global"

            [[policies.actions]]
            kind = "create_incident"
            order = 1

            [[policies.actions]]
            kind = "send_notification"
            order = 1
        "#;
        assert!(matches!(
            PolicyCatalog::from_toml_str(toml),
            Err(SentraError::Config { .. })
        ));
    }

    #[test]
    fn test_catalog_rejects_oversized_action_delay() {
        let toml = r#"
            [[policies]]
            name = "bad"
            level = "global"

            [[policies.actions]]
            kind = "enable_monitoring"
            order = 1
            delay_secs = 999999999
        "#;
        match PolicyCatalog::from_toml_str(toml) {
            Err(SentraError::Config { reason }) => {
                assert!(reason.contains("delay_secs"), "unexpected reason: {reason}");
            }
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_catalog_rejects_unknown_action_kind() {
        // ActionType is a closed set; unknown kinds fail at parse.
        let toml = r#"
            [[policies]]
            name = "bad"
            level = "global"

            [[policies.actions]]
            kind = "wipe_laptop"
            order = 1
        "#;
        assert!(matches!(
            PolicyCatalog::from_toml_str(toml),
            Err(SentraError::Config { .. })
        ));
    }

    #[test]
    fn test_catalog_parse_error() {
        let bad = "this is not valid toml ][[[";
        match PolicyCatalog::from_toml_str(bad) {
            Err(SentraError::Config { reason }) => {
                assert!(reason.contains("failed to parse"));
            }
            other => panic!("expected Config error, got {:?}", other),
        }
    }
}
