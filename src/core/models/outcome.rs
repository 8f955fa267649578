use chrono::{DateTime, Utc};

use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::health::HealthState;

/// What the maintenance run did (or would do) with one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Key is healthy, nothing to do.
    NoAction,
    /// Dry run: the key would have been rotated to the given expiry.
    WouldRotate { new_expiry: DateTime<Utc> },
    Rotated { new_expiry: DateTime<Utc> },
    /// Deliberately left alone, e.g. rotated very recently or opted out
    /// of automatic rotation.
    Skipped { reason: String },
    Failed { reason: String },
}

/// Per-key result of a maintenance run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOutcome {
    pub fingerprint: Fingerprint,
    /// Label for output, usually the key's email.
    pub name: String,
    /// `None` when the key could not be classified (e.g. metadata fetch failed).
    pub state: Option<HealthState>,
    pub action: KeyAction,
}

impl KeyOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.action, KeyAction::Failed { .. })
    }
}

/// Aggregated result of a whole maintenance run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub outcomes: Vec<KeyOutcome>,
}

impl MaintenanceReport {
    /// A run succeeds only if no key failed.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &KeyOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn count_rotated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.action, KeyAction::Rotated { .. }))
            .count()
    }
}
