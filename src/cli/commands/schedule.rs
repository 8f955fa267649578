use crate::adapters::scheduler::crontab::CrontabScheduler;
use crate::cli::ScheduleAction;
use crate::cli::context::Context;
use crate::cli::output;
use crate::config::app_config::AppConfig;
use crate::core::errors::Result;
use crate::core::traits::scheduler::Scheduler;

/// Execute the `keyward schedule` command.
///
/// The config flag is updated first so the crontab always follows the
/// recorded intent, even if editing it fails.
pub fn execute(ctx: &mut Context, action: &ScheduleAction) -> Result<()> {
    let keyward_bin = std::env::current_exe()?;
    let scheduler = CrontabScheduler::new(CrontabScheduler::job_command_for(
        &keyward_bin,
        ctx.dir(),
    ));
    let config_path = AppConfig::path_in(ctx.dir());

    let enable = match action {
        ScheduleAction::Enable => true,
        ScheduleAction::Disable => false,
        ScheduleAction::Status => return execute_status(ctx, &scheduler),
    };
    ctx.config.keyward.run_from_cron = enable;
    ctx.save_config()?;

    if enable {
        if scheduler.enable()? {
            output::success("Added Keyward to your crontab");
        } else {
            output::success("Keyward is already in your crontab");
        }
        println!("\n  Keys with rotate_automatically = true in {} are", config_path.display());
        println!("  rotated every hour when they need it.");
    } else if scheduler.disable()? {
        output::success("Removed Keyward from your crontab");
    } else {
        output::success("Keyward was not in your crontab");
    }
    Ok(())
}

/// Compare the recorded intent with what the crontab actually holds.
fn execute_status(ctx: &Context, scheduler: &impl Scheduler) -> Result<()> {
    let wanted = ctx.config.keyward.run_from_cron;
    let installed = scheduler.is_enabled()?;

    match (wanted, installed) {
        (true, true) => output::success("Automatic rotation runs hourly from cron"),
        (false, false) => output::success("Automatic rotation is not scheduled"),
        (true, false) => output::warning(
            "Automatic rotation is enabled but missing from your crontab. \
             Run 'keyward schedule enable' to restore it.",
        ),
        (false, true) => output::warning(
            "Your crontab runs Keyward although scheduling is disabled. \
             Run 'keyward schedule disable' to remove it.",
        ),
    }
    Ok(())
}
