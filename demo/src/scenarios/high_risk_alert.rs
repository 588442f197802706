//! Scenario 1: the high-risk alert path.
//!
//! A violation pushes the subject's risk score to 95. The High Risk Alert
//! policy matches, opens an incident, and notifies the analyst role. A
//! second subject at risk 80 matches nothing. Re-driving the first event
//! produces only Skipped rows.

use chrono::Utc;

use sentra_contracts::error::SentraResult;

use crate::stack::{print_executions, snapshot, violation, Stack};

const POLICIES: &str = include_str!("../../policies/high_risk.toml");

pub fn run_scenario() -> SentraResult<()> {
    println!("── Scenario: high-risk alert ──");
    let stack = Stack::build(POLICIES, vec![])?;
    let now = Utc::now();

    println!("\n[1] emp-1001 commits a data exfiltration violation (risk 95, 3 violations):");
    let event = violation("emp-1001", "data_exfiltration");
    let executions = stack
        .engine
        .evaluate_policies_at(&event, &snapshot("emp-1001", 95.0, 3), now);
    print_executions(&executions);

    for incident in stack.incidents.all() {
        println!(
            "  incident {} [{}] severity={} status={}",
            incident.incident_number, incident.title, incident.severity, incident.status
        );
    }
    for n in stack.notifications.all() {
        println!("  notification [{}] {:?}", n.title, n.target);
    }
    println!(
        "  monitoring settings: {} (72h window from the repeat-offender policy)",
        stack.settings.monitoring().len()
    );

    println!("\n[2] emp-2002 at risk 80 with 1 violation matches nothing:");
    let quiet = stack.engine.evaluate_policies_at(
        &violation("emp-2002", "unusual_hours"),
        &snapshot("emp-2002", 80.0, 1),
        now,
    );
    print_executions(&quiet);

    println!("\n[3] the same emp-1001 event is re-driven; every action is skipped:");
    let redrive = stack
        .engine
        .evaluate_policies_at(&event, &snapshot("emp-1001", 95.0, 3), now);
    print_executions(&redrive);
    println!(
        "  incidents after re-drive: {} (no duplicates)",
        stack.incidents.all().len()
    );

    println!(
        "\n  activity chain intact: {}",
        stack.activity.verify_integrity()
    );
    println!();
    Ok(())
}
