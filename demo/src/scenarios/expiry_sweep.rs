//! Scenario 3: the expiry sweeper.
//!
//! A policy puts a one-hour monitoring window and a one-hour file-share
//! restriction on the subject. A sweep two hours later deactivates both
//! and logs the expirations; a second sweep at the same instant is a
//! no-op.

use chrono::{Duration, Utc};

use sentra_contracts::error::SentraResult;

use crate::stack::{print_executions, snapshot, violation, Stack};

const POLICIES: &str = include_str!("../../policies/expiry.toml");

pub fn run_scenario() -> SentraResult<()> {
    println!("── Scenario: expiry sweep ──");
    let stack = Stack::build(POLICIES, vec![])?;
    let now = Utc::now();

    println!("\n[1] emp-1001 at risk 75 gets a one-hour monitoring window and restriction:");
    let executions = stack.engine.evaluate_policies_at(
        &violation("emp-1001", "mass_download"),
        &snapshot("emp-1001", 75.0, 1),
        now,
    );
    print_executions(&executions);
    for s in stack.settings.monitoring() {
        println!("  monitoring active={} end_time={:?}", s.is_active, s.end_time);
    }

    println!("\n[2] sweep two hours later:");
    let report = stack.sweeper.sweep(now + Duration::hours(2));
    println!(
        "  deactivated: monitoring={} logging={} restrictions={}",
        report.monitoring_deactivated, report.logging_deactivated, report.restrictions_deactivated
    );
    for s in stack.settings.monitoring() {
        println!("  monitoring active={} (row kept for audit)", s.is_active);
    }
    for r in stack.settings.restrictions() {
        println!("  restriction active={} removed_at={:?}", r.is_active, r.removed_at);
    }

    println!("\n[3] a second sweep at the same instant:");
    let again = stack.sweeper.sweep(now + Duration::hours(2));
    println!("  deactivated: {} (no-op)", again.total_deactivated());

    println!("\n  activity entries (including expirations): {}", stack.activity.all().len());
    println!("  activity chain intact: {}", stack.activity.verify_integrity());
    println!();
    Ok(())
}
