//! Sentra Policy Execution Engine — Demo CLI
//!
//! Runs one or all of the four demo scenarios. Each scenario wires real
//! Sentra components (policy catalog, engine, dispatcher, in-memory
//! stores, sweeper) over mock employee risk data.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- high-risk-alert
//!   cargo run -p demo -- failing-action
//!   cargo run -p demo -- expiry-sweep
//!   cargo run -p demo -- escalation

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod scenarios;
mod stack;

use scenarios::{escalation, expiry_sweep, failing_action, high_risk_alert};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Sentra — insider-threat policy execution engine demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Sentra policy execution engine demo",
    long_about = "Runs Sentra demo scenarios showing condition evaluation, idempotent\n\
                  action dispatch, incident lifecycle, expiry sweeping, and the\n\
                  hash-chained activity log."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four scenarios in sequence.
    RunAll,
    /// Scenario 1: high risk score opens an incident and notifies analysts.
    HighRiskAlert,
    /// Scenario 2: a failing notification leaves the sibling incident intact.
    FailingAction,
    /// Scenario 3: expired settings are swept exactly once.
    ExpirySweep,
    /// Scenario 4: a repeat match escalates the open incident.
    Escalation,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Structured logging. Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::HighRiskAlert => high_risk_alert::run_scenario(),
        Command::FailingAction => failing_action::run_scenario(),
        Command::ExpirySweep => expiry_sweep::run_scenario(),
        Command::Escalation => escalation::run_scenario(),
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_all() -> sentra_contracts::error::SentraResult<()> {
    high_risk_alert::run_scenario()?;
    failing_action::run_scenario()?;
    expiry_sweep::run_scenario()?;
    escalation::run_scenario()?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Sentra — Policy Execution Engine");
    println!("Insider Threat Response Demo");
    println!("================================");
    println!();
    println!("Pipeline per trigger event:");
    println!("  [1] Applicable policies ordered by specificity, priority, age");
    println!("  [2] Condition chains folded left to right (unknowns fail closed)");
    println!("  [3] Dispatcher records a pending row per action (idempotency key)");
    println!("  [4] Handlers run in order under a bounded timeout; failures isolate");
    println!("  [5] Incidents, settings, notifications, and chained activity persist");
    println!();
}
