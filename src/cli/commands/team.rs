use uuid::Uuid;

use crate::cli::TeamAction;
use crate::cli::context::Context;
use crate::cli::format::pluralize;
use crate::cli::output;
use crate::core::errors::{KeywardError, Result};
use crate::core::models::fingerprint::Fingerprint;

/// Execute the `keyward team` command.
pub fn execute(ctx: &mut Context, action: &TeamAction) -> Result<()> {
    match action {
        TeamAction::Requests => execute_requests(ctx),
        TeamAction::Cancel { team, fingerprint } => execute_cancel(ctx, team, fingerprint),
    }
}

/// List requests to join teams, newest first.
fn execute_requests(ctx: &Context) -> Result<()> {
    let requests = ctx.store.join_requests()?;
    if requests.is_empty() {
        output::warning("No pending requests to join a team.");
        return Ok(());
    }

    output::header(&format!(
        "Requests to join teams ({})",
        pluralize(requests.len(), "request", "requests")
    ));
    for request in &requests {
        let team = if request.team_name.is_empty() {
            request.team_uuid.to_string()
        } else {
            format!("{} ({})", request.team_name, request.team_uuid)
        };
        println!("\n  {team}");
        output::detail(&format!("Key {}", request.fingerprint));
        output::detail(&format!(
            "Requested {}",
            request.requested_at.format("%-d %b %Y %H:%M UTC")
        ));
    }
    Ok(())
}

/// Forget every request `fingerprint` made to join `team`.
fn execute_cancel(ctx: &Context, team: &str, fingerprint: &str) -> Result<()> {
    let team_uuid = Uuid::parse_str(team).map_err(|e| KeywardError::InvalidArgument {
        detail: format!("'{team}' is not a team UUID: {e}"),
    })?;
    let fingerprint = Fingerprint::parse(fingerprint)?;

    match ctx.store.existing_join_request(team_uuid, &fingerprint)? {
        Some(request) => {
            ctx.store.delete_join_request(team_uuid, &fingerprint)?;
            let team = if request.team_name.is_empty() {
                team_uuid.to_string()
            } else {
                request.team_name
            };
            output::success(&format!("Cancelled request to join {team}"));
        }
        None => output::warning(&format!(
            "No request found for key {fingerprint} to join team {team_uuid}"
        )),
    }
    Ok(())
}
