use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::core::errors::{KeywardError, Result};
use crate::core::traits::scheduler::Scheduler;

/// Marker comment used to identify the Keyward-managed crontab line.
const CRON_MARKER: &str = "# keyward-managed-job";

/// How often unattended maintenance runs.
const CRON_SCHEDULE: &str = "@hourly";

/// Scheduler that keeps one marked line in the user's crontab.
///
/// Lines without the marker are never touched.
pub struct CrontabScheduler {
    crontab_bin: PathBuf,
    /// Command line cron runs, e.g. `/usr/bin/keyward --dir ... key rotate automatic --cron-output`.
    job_command: String,
}

impl CrontabScheduler {
    pub fn new(job_command: String) -> Self {
        Self {
            crontab_bin: PathBuf::from("crontab"),
            job_command,
        }
    }

    /// Build the job command for `keyward_bin` operating on `profile_dir`.
    pub fn job_command_for(keyward_bin: &Path, profile_dir: &Path) -> String {
        let command = format!(
            "{} --dir {} key rotate automatic --cron-output",
            shell_quote(&keyward_bin.display().to_string()),
            shell_quote(&profile_dir.display().to_string()),
        );
        // cron turns a bare `%` in the command field into a newline.
        command.replace('%', r"\%")
    }

    fn job_line(&self) -> String {
        format!("{CRON_SCHEDULE} {} {CRON_MARKER}", self.job_command)
    }

    fn read_crontab(&self) -> Result<String> {
        let output = Command::new(&self.crontab_bin)
            .arg("-l")
            .output()
            .map_err(|e| KeywardError::Scheduler {
                detail: format!("Failed to run crontab: {e}"),
            })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("no crontab for") {
            return Ok(String::new());
        }
        Err(KeywardError::Scheduler {
            detail: format!("crontab -l failed: {}", stderr.trim()),
        })
    }

    fn write_crontab(&self, content: &str) -> Result<()> {
        let mut child = Command::new(&self.crontab_bin)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| KeywardError::Scheduler {
                detail: format!("Failed to run crontab: {e}"),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(content.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(KeywardError::Scheduler {
                detail: format!(
                    "crontab - failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

impl Scheduler for CrontabScheduler {
    fn enable(&self) -> Result<bool> {
        let current = self.read_crontab()?;
        match add_job(&current, &self.job_line()) {
            Some(updated) => {
                self.write_crontab(&updated)?;
                info!("added keyward job to crontab");
                Ok(true)
            }
            None => {
                debug!("crontab already up to date");
                Ok(false)
            }
        }
    }

    fn disable(&self) -> Result<bool> {
        let current = self.read_crontab()?;
        match remove_job(&current) {
            Some(updated) => {
                self.write_crontab(&updated)?;
                info!("removed keyward job from crontab");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn is_enabled(&self) -> Result<bool> {
        Ok(self.read_crontab()?.lines().any(is_managed))
    }
}

fn is_managed(line: &str) -> bool {
    line.trim_end().ends_with(CRON_MARKER)
}

/// Crontab text with `job_line` as the only managed line, or `None` if
/// it is already exactly that.
fn add_job(current: &str, job_line: &str) -> Option<String> {
    let managed: Vec<&str> = current.lines().filter(|l| is_managed(l)).collect();
    if managed == [job_line] {
        return None;
    }

    let mut lines: Vec<&str> = current.lines().filter(|l| !is_managed(l)).collect();
    lines.push(job_line);
    Some(lines.join("\n") + "\n")
}

/// Crontab text without any managed line, or `None` if there was none.
fn remove_job(current: &str) -> Option<String> {
    if !current.lines().any(is_managed) {
        return None;
    }

    let lines: Vec<&str> = current.lines().filter(|l| !is_managed(l)).collect();
    if lines.is_empty() {
        return Some(String::new());
    }
    Some(lines.join("\n") + "\n")
}

/// Single-quote `s` for /bin/sh unless it is plainly safe.
fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:=@".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> String {
        CrontabScheduler::new("keyward key rotate automatic --cron-output".into()).job_line()
    }

    #[test]
    fn add_to_empty_crontab() {
        let updated = add_job("", &job()).unwrap();
        assert_eq!(updated, format!("{}\n", job()));
        assert!(updated.contains(CRON_MARKER));
    }

    #[test]
    fn add_keeps_foreign_lines() {
        let current = "MAILTO=jane@example.com\n0 3 * * * backup.sh\n";
        let updated = add_job(current, &job()).unwrap();
        assert!(updated.starts_with(current));
        assert!(updated.ends_with(&format!("{}\n", job())));
    }

    #[test]
    fn add_is_idempotent() {
        let once = add_job("0 3 * * * backup.sh\n", &job()).unwrap();
        assert_eq!(add_job(&once, &job()), None);
    }

    #[test]
    fn add_replaces_outdated_managed_line() {
        let stale = format!("@daily /old/keyward key rotate automatic {CRON_MARKER}\n");
        let updated = add_job(&stale, &job()).unwrap();
        assert_eq!(updated.lines().filter(|l| is_managed(l)).count(), 1);
        assert!(!updated.contains("/old/keyward"));
    }

    #[test]
    fn remove_only_managed_line() {
        let current = format!("0 3 * * * backup.sh\n{}\n", job());
        assert_eq!(remove_job(&current).unwrap(), "0 3 * * * backup.sh\n");
    }

    #[test]
    fn remove_without_managed_line_is_none() {
        assert_eq!(remove_job("0 3 * * * backup.sh\n"), None);
        assert_eq!(remove_job(""), None);
    }

    #[test]
    fn remove_last_line_leaves_empty_crontab() {
        assert_eq!(remove_job(&format!("{}\n", job())).unwrap(), "");
    }

    #[test]
    fn job_command_quotes_paths_with_spaces() {
        let cmd = CrontabScheduler::job_command_for(
            Path::new("/usr/local/bin/keyward"),
            Path::new("/home/jane/My Keys"),
        );
        assert_eq!(
            cmd,
            "/usr/local/bin/keyward --dir '/home/jane/My Keys' key rotate automatic --cron-output"
        );
    }

    #[test]
    fn job_command_escapes_percent_for_cron() {
        let cmd = CrontabScheduler::job_command_for(
            Path::new("/usr/local/bin/keyward"),
            Path::new("/srv/keys-100%"),
        );
        assert_eq!(
            cmd,
            r"/usr/local/bin/keyward --dir '/srv/keys-100\%' key rotate automatic --cron-output"
        );

        let scheduler = CrontabScheduler::new(cmd);
        let crontab = add_job("", &scheduler.job_line()).unwrap();
        assert!(!crontab.contains("100%"));
        assert!(remove_job(&crontab).is_some());
    }
}
