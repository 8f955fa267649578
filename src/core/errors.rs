use std::path::PathBuf;

/// All domain errors for Keyward.
///
/// Each variant provides enough context to diagnose the issue
/// without needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum KeywardError {
    #[error(
        "Could not use the key database at {path}: {detail}\n\n  \
         Check the file permissions, or move the file aside to start over.\n  \
         Keyward will recreate it the next time a key is linked."
    )]
    Store { path: PathBuf, detail: String },

    #[error("Invalid argument: {detail}")]
    InvalidArgument { detail: String },

    #[error(
        "Invalid fingerprint '{input}'\n\n  \
         Expected 40 hexadecimal characters, for example:\n    \
         AB01 AB01 AB01 AB01 AB01  AB01 AB01 AB01 AB01 AB01"
    )]
    InvalidFingerprint { input: String },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error(
        "This profile uses format version {profile_version}, but your Keyward \
         only supports up to version {supported_version}.\n\n  \
         Solutions:\n    \
         → Install the latest release: cargo install keyward --force"
    )]
    FormatVersionTooNew {
        profile_version: u32,
        supported_version: u32,
    },

    #[error("GnuPG error: {reason}")]
    Keyring { reason: String },

    #[error(
        "GnuPG 2.x not found\n\n  \
         Keyward searched for:\n    \
         {searched}\n\n  \
         Solutions:\n    \
         → Install GnuPG 2 from your package manager\n    \
         → Or point Keyward at it: keyward --gpg /path/to/gpg2 ..."
    )]
    GpgNotFound { searched: String },

    #[error("Key {fingerprint} not found in GnuPG")]
    KeyNotFound { fingerprint: String },

    #[error(
        "Maintenance failed for {failed} key(s)\n\n  \
         Run 'keyward key rotate --dry-run --verbose' to see what went wrong."
    )]
    MaintenanceFailed { failed: usize },

    #[error("Scheduler error: {detail}")]
    Scheduler { detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KeywardError>;
