use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::{KeywardError, Result};
use crate::core::models::health::HealthState;

/// Longest window, in days, any policy threshold may span (about a century).
pub const MAX_POLICY_DAYS: i64 = 36_500;

/// Thresholds that decide when a key needs maintenance.
///
/// Read from the `[policy]` section of `config.toml`. All windows are in
/// whole days except the minimum interval between two rotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationPolicy {
    /// Last days before expiry in which a key is overdue.
    pub urgent_window_days: i64,
    /// Days before expiry from which a key is due for rotation.
    pub early_warning_days: i64,
    /// Expiry further out than this is considered too long.
    pub max_validity_days: i64,
    /// Maximum time between two rotations of the same key.
    pub rotation_cadence_days: i64,
    /// Validity given to a key when it is rotated.
    pub new_validity_days: i64,
    /// Never rotate the same key twice within this many hours.
    pub min_rotation_interval_hours: i64,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            urgent_window_days: 7,
            early_warning_days: 30,
            max_validity_days: 90,
            rotation_cadence_days: 30,
            new_validity_days: 60,
            min_rotation_interval_hours: 24,
        }
    }
}

impl RotationPolicy {
    /// Check the thresholds are consistent with each other.
    ///
    /// A freshly rotated key must come out healthy: its new validity has to
    /// sit beyond the early-warning window and within the maximum.
    pub fn validate(&self) -> Result<()> {
        let invalid = |detail: String| Err(KeywardError::InvalidConfig { detail });

        if self.urgent_window_days < 0 {
            return invalid("policy.urgent_window_days must not be negative".into());
        }
        if self.urgent_window_days >= self.early_warning_days {
            return invalid(format!(
                "policy.urgent_window_days ({}) must be less than policy.early_warning_days ({})",
                self.urgent_window_days, self.early_warning_days
            ));
        }
        if self.early_warning_days >= self.new_validity_days {
            return invalid(format!(
                "policy.new_validity_days ({}) must be greater than policy.early_warning_days ({})",
                self.new_validity_days, self.early_warning_days
            ));
        }
        if self.new_validity_days > self.max_validity_days {
            return invalid(format!(
                "policy.new_validity_days ({}) must not exceed policy.max_validity_days ({})",
                self.new_validity_days, self.max_validity_days
            ));
        }
        if self.rotation_cadence_days <= 0 {
            return invalid("policy.rotation_cadence_days must be positive".into());
        }
        if self.min_rotation_interval_hours < 0 {
            return invalid("policy.min_rotation_interval_hours must not be negative".into());
        }
        if self.max_validity_days > MAX_POLICY_DAYS {
            return invalid(format!(
                "policy.max_validity_days ({}) must not exceed {MAX_POLICY_DAYS}",
                self.max_validity_days
            ));
        }
        if self.rotation_cadence_days > MAX_POLICY_DAYS {
            return invalid(format!(
                "policy.rotation_cadence_days ({}) must not exceed {MAX_POLICY_DAYS}",
                self.rotation_cadence_days
            ));
        }
        if self.min_rotation_interval_hours > MAX_POLICY_DAYS * 24 {
            return invalid(format!(
                "policy.min_rotation_interval_hours ({}) must not exceed {}",
                self.min_rotation_interval_hours,
                MAX_POLICY_DAYS * 24
            ));
        }
        Ok(())
    }

    /// Expiry to give a key rotated at `now`.
    pub fn next_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(self.new_validity_days)
    }

    pub fn rotation_cadence(&self) -> Duration {
        Duration::days(self.rotation_cadence_days)
    }

    pub fn min_rotation_interval(&self) -> Duration {
        Duration::hours(self.min_rotation_interval_hours)
    }
}

/// Decide the health of a key from its expiry dates and rotation history.
///
/// Total over its inputs: missing expiry data is a state, not an error.
pub fn classify(
    primary_expiry: Option<DateTime<Utc>>,
    subkey_expiry: Option<DateTime<Utc>>,
    last_rotated_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    policy: &RotationPolicy,
) -> HealthState {
    let (Some(primary), Some(subkey)) = (primary_expiry, subkey_expiry) else {
        return HealthState::NoExpiry;
    };
    let expiry = primary.min(subkey);

    if expiry <= now {
        return HealthState::Expired {
            days_since_expiry: (now - expiry).num_days(),
        };
    }

    let days_until_expiry = (expiry - now).num_days();

    if days_until_expiry <= policy.urgent_window_days {
        return HealthState::OverdueForRotation { days_until_expiry };
    }

    let cadence_missed =
        last_rotated_at.is_some_and(|at| now - at > policy.rotation_cadence());

    if days_until_expiry <= policy.early_warning_days || cadence_missed {
        return HealthState::DueForRotation;
    }

    if days_until_expiry > policy.max_validity_days {
        return HealthState::LongExpiry;
    }

    HealthState::Healthy
}
