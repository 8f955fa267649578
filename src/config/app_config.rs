use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::errors::{KeywardError, Result};
use crate::core::models::fingerprint::Fingerprint;
use crate::core::services::policy::RotationPolicy;

/// Current format version supported by this build of Keyward.
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// Name of the configuration file inside the profile directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Profile configuration read from `<profile>/config.toml`.
///
/// Every section is optional: a profile without a config file runs with
/// the default policy and no per-key settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub keyward: KeywardSection,
    pub policy: RotationPolicy,
    /// Per-key settings, keyed by the 40-digit hex fingerprint.
    pub keys: BTreeMap<String, KeySettings>,
}

impl AppConfig {
    /// Load the configuration from `<profile>/config.toml`.
    ///
    /// A missing file yields the defaults. The format version and the
    /// policy thresholds are checked before the config is handed out.
    pub fn load(profile_dir: &Path) -> Result<Self> {
        let config_path = Self::path_in(profile_dir);
        let content = match std::fs::read_to_string(&config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let mut config: Self = toml::from_str(&content).map_err(|e| KeywardError::InvalidConfig {
            detail: format!("Failed to parse {}: {e}", config_path.display()),
        })?;

        if config.keyward.format_version > CURRENT_FORMAT_VERSION {
            return Err(KeywardError::FormatVersionTooNew {
                profile_version: config.keyward.format_version,
                supported_version: CURRENT_FORMAT_VERSION,
            });
        }

        // Any spelling `Fingerprint::parse` accepts is stored as upper-case hex.
        let mut keys = BTreeMap::new();
        for (name, settings) in std::mem::take(&mut config.keys) {
            let fingerprint = Fingerprint::parse(&name).map_err(|_| KeywardError::InvalidConfig {
                detail: format!("[keys.\"{name}\"] is not a valid fingerprint"),
            })?;
            if keys.insert(fingerprint.hex().to_string(), settings).is_some() {
                return Err(KeywardError::InvalidConfig {
                    detail: format!("[keys] lists {fingerprint} more than once"),
                });
            }
        }
        config.keys = keys;

        config.policy.validate()?;
        Ok(config)
    }

    /// Write the configuration back to `<profile>/config.toml`.
    pub fn save(&self, profile_dir: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| KeywardError::InvalidConfig {
            detail: format!("Failed to serialize config: {e}"),
        })?;
        std::fs::create_dir_all(profile_dir)?;
        std::fs::write(Self::path_in(profile_dir), content)?;
        Ok(())
    }

    pub fn path_in(profile_dir: &Path) -> PathBuf {
        profile_dir.join(CONFIG_FILE)
    }

    /// Whether unattended maintenance may rotate this key.
    ///
    /// Keys without an entry are left to manual rotation.
    pub fn rotates_automatically(&self, fingerprint: &Fingerprint) -> bool {
        self.keys
            .get(fingerprint.hex())
            .is_some_and(|settings| settings.rotate_automatically)
    }

    pub fn set_rotate_automatically(&mut self, fingerprint: &Fingerprint, enabled: bool) {
        self.keys
            .entry(fingerprint.hex().to_string())
            .or_default()
            .rotate_automatically = enabled;
    }
}

/// The `[keyward]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywardSection {
    /// Format version for backward compatibility. Defaults to 1 if missing.
    pub format_version: u32,
    /// Set by `keyward schedule enable`.
    pub run_from_cron: bool,
}

impl Default for KeywardSection {
    fn default() -> Self {
        Self {
            format_version: CURRENT_FORMAT_VERSION,
            run_from_cron: false,
        }
    }
}

/// A `[keys."<HEX>"]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySettings {
    pub rotate_automatically: bool,
}
