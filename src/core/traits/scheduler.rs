use crate::core::errors::Result;

/// Port for the system scheduler that runs unattended maintenance.
pub trait Scheduler {
    /// Install the periodic job. Returns `true` if anything changed.
    fn enable(&self) -> Result<bool>;

    /// Remove the periodic job. Returns `true` if anything changed.
    fn disable(&self) -> Result<bool>;

    fn is_enabled(&self) -> Result<bool>;
}
