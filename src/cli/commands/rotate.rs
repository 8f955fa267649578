use chrono::Utc;

use crate::cli::context::Context;
use crate::cli::format::pluralize;
use crate::cli::output;
use crate::core::errors::{KeywardError, Result};
use crate::core::models::outcome::{KeyAction, KeyOutcome, MaintenanceReport};
use crate::core::services::maintenance_service::{MaintenanceService, RunOptions};

/// Execute `keyward key rotate [automatic]`.
///
/// `cron_output` is `Some` for automatic runs; when it is `Some(true)` only
/// failures are printed.
pub fn execute(ctx: &mut Context, dry_run: bool, cron_output: Option<bool>) -> Result<()> {
    let opts = RunOptions {
        dry_run,
        automatic: cron_output.is_some(),
    };
    let quiet = ctx.quiet || cron_output == Some(true);

    let service = MaintenanceService {
        store: &ctx.store,
        keyring: &ctx.keyring,
        config: &ctx.config,
    };
    let report = service.run(&opts, Utc::now())?;

    if quiet {
        for outcome in report.failures() {
            print_outcome(outcome);
        }
    } else {
        print_report(&report, dry_run);
    }

    if !report.is_success() {
        return Err(KeywardError::MaintenanceFailed {
            failed: report.failures().count(),
        });
    }
    Ok(())
}

fn print_report(report: &MaintenanceReport, dry_run: bool) {
    if report.outcomes.is_empty() {
        output::warning("No keys managed yet.");
        println!("  Run 'keyward key create' or 'keyward key from-gpg' to add one.");
        return;
    }

    output::header(&format!(
        "Checking {}",
        pluralize(report.outcomes.len(), "key", "keys")
    ));
    for outcome in &report.outcomes {
        print_outcome(outcome);
    }

    let pending = report
        .outcomes
        .iter()
        .filter(|o| matches!(o.action, KeyAction::WouldRotate { .. }))
        .count();
    println!();
    if dry_run {
        if pending > 0 {
            println!(
                "  {} would be rotated. Run without --dry-run to apply.",
                pluralize(pending, "key", "keys")
            );
        } else {
            println!("  Nothing to do.");
        }
    } else {
        println!(
            "  {} rotated.",
            pluralize(report.count_rotated(), "key", "keys")
        );
    }
}

fn print_outcome(outcome: &KeyOutcome) {
    let name = &outcome.name;
    let state = outcome.state.map(|s| s.as_str()).unwrap_or("unknown");
    match &outcome.action {
        KeyAction::NoAction => output::success(&format!("{name}: healthy")),
        KeyAction::WouldRotate { new_expiry } => output::warning(&format!(
            "{name}: {state}, would extend expiry to {}",
            new_expiry.format("%-d %b %Y")
        )),
        KeyAction::Rotated { new_expiry } => output::success(&format!(
            "{name}: extended expiry to {}",
            new_expiry.format("%-d %b %Y")
        )),
        KeyAction::Skipped { reason } => output::detail(&format!("{name}: skipped, {reason}")),
        KeyAction::Failed { reason } => output::error(&format!("{name}: {reason}")),
    }
}
