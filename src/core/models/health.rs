/// Health of a managed key, as decided by the rotation policy.
///
/// The day counts are part of the contract: output formatting relies on
/// them to say "today", "tomorrow" or "in N days".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    /// The primary key or its encryption subkey never expires.
    NoExpiry,
    /// Expiry is set further out than the policy allows.
    LongExpiry,
    DueForRotation,
    /// Inside the urgent window. `0` means the key expires today.
    OverdueForRotation { days_until_expiry: i64 },
    /// `0` on the day of expiry.
    Expired { days_since_expiry: i64 },
}

impl HealthState {
    /// Whether maintenance should touch this key.
    pub fn needs_rotation(&self) -> bool {
        !matches!(self, HealthState::Healthy)
    }

    /// Short machine-friendly name, used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "healthy",
            HealthState::NoExpiry => "no_expiry",
            HealthState::LongExpiry => "long_expiry",
            HealthState::DueForRotation => "due_for_rotation",
            HealthState::OverdueForRotation { .. } => "overdue_for_rotation",
            HealthState::Expired { .. } => "expired",
        }
    }
}
