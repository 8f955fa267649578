use std::path::{Path, PathBuf};

use tracing::debug;

use crate::adapters::keyring::gpg_keyring::GpgKeyring;
use crate::adapters::store::json_store::JsonStore;
use crate::cli::Cli;
use crate::config::app_config::AppConfig;
use crate::core::errors::{KeywardError, Result};

/// Name of the profile directory under the user's config directory.
const PROFILE_DIR_NAME: &str = "keyward";

/// Everything a command needs, built once in `main` and passed down.
pub struct Context {
    pub dir: PathBuf,
    pub config: AppConfig,
    pub store: JsonStore,
    pub keyring: GpgKeyring,
    pub quiet: bool,
}

impl Context {
    /// Resolve the profile directory and load its config and database.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let dir = match &cli.dir {
            Some(dir) => dir.clone(),
            None => default_profile_dir()?,
        };
        debug!(dir = %dir.display(), "using profile directory");

        let config = AppConfig::load(&dir)?;
        let mut keyring = match &cli.gpg {
            Some(path) => GpgKeyring::with_path(path.clone()),
            None => GpgKeyring::new(),
        };
        if let Some(home) = &cli.gnupg_home {
            keyring = keyring.with_home_dir(home.clone());
        }

        let store = JsonStore::new(&dir);
        debug!(db = %store.path().display(), "using key database");

        Ok(Self {
            store,
            config,
            keyring,
            quiet: cli.quiet,
            dir,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist changes made to `self.config`.
    pub fn save_config(&self) -> Result<()> {
        self.config.save(&self.dir)
    }
}

/// `<config dir>/keyward`, e.g. `~/.config/keyward` on Linux.
fn default_profile_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|base| base.join(PROFILE_DIR_NAME))
        .ok_or_else(|| KeywardError::InvalidConfig {
            detail: "Could not determine your config directory.\n\n  \
                     Pass --dir or set KEYWARD_DIR to choose where Keyward keeps its files."
                .into(),
        })
}
