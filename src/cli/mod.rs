pub mod commands;
pub mod context;
pub mod format;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Keep your OpenPGP keys healthy: rotate before they expire.
#[derive(Parser, Debug)]
#[command(name = "keyward", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Profile directory holding config.toml and db.json
    /// [default: <config dir>/keyward]
    #[arg(long, global = true, env = "KEYWARD_DIR")]
    pub dir: Option<PathBuf>,

    /// Path to the GnuPG 2 binary (searched for when omitted)
    #[arg(long, global = true)]
    pub gpg: Option<PathBuf>,

    /// Alternative GnuPG home directory
    #[arg(long, global = true)]
    pub gnupg_home: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode: only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, link, list and rotate managed keys
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Run automatic rotation from cron
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// Requests to join teams
    Team {
        #[command(subcommand)]
        action: TeamAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeyAction {
    /// Generate a new key in GnuPG and manage it
    Create,

    /// Manage an existing secret key from GnuPG
    FromGpg {
        /// Fingerprint of the key to link (asks when omitted)
        fingerprint: Option<String>,
    },

    /// Import an armored secret key file into GnuPG and manage it
    Import {
        /// File holding the ascii-armored secret key
        file: PathBuf,
    },

    /// List managed keys and their health
    List,

    /// Print the ascii-armored public key of a managed key
    Export {
        /// Fingerprint of the key
        fingerprint: String,
    },

    /// Rotate keys that are due
    Rotate {
        /// Don't change anything: only show what would happen
        #[arg(long)]
        dry_run: bool,

        #[command(subcommand)]
        mode: Option<RotateMode>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RotateMode {
    /// Unattended run over keys with automatic rotation enabled
    Automatic {
        /// Only print output on errors
        #[arg(long)]
        cron_output: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ScheduleAction {
    /// Add the hourly rotation job to your crontab
    Enable,
    /// Remove the rotation job from your crontab
    Disable,
    /// Show whether automatic rotation is scheduled
    Status,
}

#[derive(Subcommand, Debug)]
pub enum TeamAction {
    /// List pending requests to join teams
    Requests,
    /// Forget a request to join a team
    Cancel {
        /// UUID of the team
        team: String,
        /// Fingerprint of the key that asked to join
        fingerprint: String,
    },
}
