use colored::{ColoredString, Colorize};

use crate::core::models::health::HealthState;

/// How loudly a warning line should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warn,
    Urgent,
    /// Past the point of action, shown muted.
    Faded,
}

/// One human-readable line describing a key's health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningLine {
    pub severity: Severity,
    pub text: String,
}

impl WarningLine {
    fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }

    pub fn colored(&self) -> ColoredString {
        match self.severity {
            Severity::Warn => self.text.yellow(),
            Severity::Urgent => self.text.red(),
            Severity::Faded => self.text.dimmed(),
        }
    }
}

/// Lines to print under a key in `keyward key list`. Healthy keys get none.
pub fn warning_lines(state: &HealthState) -> Vec<WarningLine> {
    match *state {
        HealthState::Healthy => vec![],
        HealthState::DueForRotation => vec![WarningLine::new(Severity::Warn, "Due for rotation")],
        HealthState::OverdueForRotation { days_until_expiry } => {
            let when = match days_until_expiry {
                0 => "Expires today!".to_string(),
                1 => "Expires tomorrow!".to_string(),
                n => format!("Expires in {n} days!"),
            };
            vec![
                WarningLine::new(Severity::Urgent, "Overdue for rotation"),
                WarningLine::new(Severity::Urgent, when),
            ]
        }
        HealthState::NoExpiry => vec![WarningLine::new(Severity::Urgent, "No expiry date set")],
        HealthState::LongExpiry => {
            vec![WarningLine::new(Severity::Warn, "Expiry date too far off")]
        }
        HealthState::Expired { days_since_expiry } => {
            let text = match days_since_expiry {
                0 => "Expired today".to_string(),
                1 => "Expired yesterday".to_string(),
                n @ 2..=9 => format!("Expired {n} days ago"),
                _ => "Expired".to_string(),
            };
            vec![WarningLine::new(Severity::Faded, text)]
        }
    }
}

/// "1 key", "3 keys".
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}
