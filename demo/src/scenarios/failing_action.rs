//! Scenario 2: a failing action does not take its siblings down.
//!
//! The notification handler is replaced with one that always fails, as if
//! the notification service were down. The incident action before it still
//! succeeds, and the failure lands on the execution row.

use std::sync::Arc;

use chrono::Utc;

use sentra_contracts::{
    error::{SentraError, SentraResult},
    policy::ActionType,
};
use sentra_core::traits::{ActionContext, ActionHandler};

use crate::stack::{print_executions, snapshot, violation, Stack};

const POLICIES: &str = include_str!("../../policies/high_risk.toml");

struct BrokenNotifier;

impl ActionHandler for BrokenNotifier {
    fn execute(&self, _ctx: &ActionContext) -> SentraResult<serde_json::Value> {
        Err(SentraError::HandlerFailed {
            action: "send_notification".to_string(),
            reason: "notification service unavailable".to_string(),
        })
    }
}

pub fn run_scenario() -> SentraResult<()> {
    println!("── Scenario: failing action ──");
    let stack = Stack::build(
        POLICIES,
        vec![(
            ActionType::SendNotification,
            Arc::new(BrokenNotifier) as Arc<dyn ActionHandler>,
        )],
    )?;

    println!("\n[1] emp-1001 at risk 95 while the notification service is down:");
    let executions = stack.engine.evaluate_policies_at(
        &violation("emp-1001", "data_exfiltration"),
        &snapshot("emp-1001", 95.0, 3),
        Utc::now(),
    );
    print_executions(&executions);

    println!(
        "\n  incidents created despite the outage: {}",
        stack.incidents.all().len()
    );
    println!(
        "  notifications recorded: {}",
        stack.notifications.all().len()
    );
    println!();
    Ok(())
}
