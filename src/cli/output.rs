//! Terminal output shared by the commands.
//!
//! Status lines go to stdout so `key list` and `key rotate` can be piped,
//! errors and the key generation spinner go to stderr.

use std::time::Duration;

use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};

/// Spinner shown while gpg generates a key. Hidden when stderr is not a
/// terminal, so cron runs stay silent.
pub fn spinner(msg: &str) -> ProgressBar {
    let sp = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("  {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    sp.set_style(style);
    sp.set_message(msg.to_string());
    sp.enable_steady_tick(Duration::from_millis(100));
    sp
}

/// Clear the spinner and report the finished step.
pub fn finish_spinner(sp: ProgressBar, msg: &str) {
    sp.finish_and_clear();
    success(msg);
}

/// Section title, e.g. `Checking 3 keys`.
pub fn header(msg: &str) {
    println!("\n{}", msg.bold());
}

/// Dimmed line under a key, e.g. its subkey or a skipped reason.
pub fn detail(msg: &str) {
    println!("    {}", msg.dimmed());
}

pub fn success(msg: &str) {
    println!("{}", marked("✓".green(), msg));
}

/// A key that needs attention, or a step that did nothing.
pub fn warning(msg: &str) {
    println!("{}", marked("⚠".yellow(), msg));
}

/// Failures, including per-key rotation errors printed by cron runs.
pub fn error(msg: &str) {
    eprintln!("{}", marked("✗".red(), msg));
}

fn marked(mark: ColoredString, msg: &str) -> String {
    format!("  {mark} {msg}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_lines_are_indented_under_headers() {
        assert_eq!(marked("✓".normal(), "Key linked"), "  ✓ Key linked");
    }
}
