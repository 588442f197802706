//! Scenario 4: escalation instead of duplicate incidents.
//!
//! A high-risk event opens an incident. A later critical-risk event for
//! the same subject matches the critical policy, which escalates the open
//! incident rather than opening a second one for the same pattern.

use chrono::{Duration, Utc};

use sentra_contracts::error::SentraResult;

use crate::stack::{print_executions, snapshot, violation, Stack};

const POLICIES: &str = include_str!("../../policies/escalation.toml");

pub fn run_scenario() -> SentraResult<()> {
    println!("── Scenario: escalation ──");
    let stack = Stack::build(POLICIES, vec![])?;
    let now = Utc::now();

    println!("\n[1] emp-1001 at risk 95 opens a high-severity incident:");
    let first = stack.engine.evaluate_policies_at(
        &violation("emp-1001", "data_exfiltration"),
        &snapshot("emp-1001", 95.0, 3),
        now,
    );
    print_executions(&first);
    for i in stack.incidents.all() {
        println!(
            "  incident {} severity={} escalation={}",
            i.incident_number, i.severity, i.escalation
        );
    }

    println!("\n[2] five minutes later, risk 99 matches the critical policy:");
    let second = stack.engine.evaluate_policies_at(
        &violation("emp-1001", "data_exfiltration"),
        &snapshot("emp-1001", 99.0, 4),
        now + Duration::minutes(5),
    );
    print_executions(&second);

    let incidents = stack.incidents.all();
    let original = &incidents[0];
    println!(
        "\n  original incident {} escalation={} escalated_at={:?}",
        original.incident_number, original.escalation, original.escalated_at
    );
    println!("  update history:");
    for u in stack.incidents.history(original.id) {
        println!(
            "    {}: {} -> {} by {}",
            u.field, u.old_value, u.new_value, u.actor
        );
    }
    println!();
    Ok(())
}
