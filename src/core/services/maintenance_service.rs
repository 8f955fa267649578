use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::adapters::store::json_store::JsonStore;
use crate::config::app_config::AppConfig;
use crate::core::errors::Result;
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::outcome::{KeyAction, KeyOutcome, MaintenanceReport};
use crate::core::services::policy::{RotationPolicy, classify};
use crate::core::traits::keyring::Keyring;

/// Verb under which completed rotations are recorded in the key database.
pub const ROTATE_ACTION: &str = "rotate";

/// How a maintenance run was started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Classify and report, but never touch the keyring or the database.
    pub dry_run: bool,
    /// Unattended run (cron): only keys opted in to automatic rotation.
    pub automatic: bool,
}

/// Walks every managed key, decides its health and rotates it when needed.
///
/// A failure on one key is recorded in the report and never stops the
/// remaining keys from being processed.
pub struct MaintenanceService<'a, K: Keyring> {
    pub store: &'a JsonStore,
    pub keyring: &'a K,
    pub config: &'a AppConfig,
}

impl<K: Keyring> MaintenanceService<'_, K> {
    fn policy(&self) -> &RotationPolicy {
        &self.config.policy
    }

    /// Run maintenance over all imported keys, in the order they were linked.
    ///
    /// Only database errors while reading the key list or rotation history
    /// are returned as `Err`; everything key-specific ends up in the report.
    pub fn run(&self, opts: &RunOptions, now: DateTime<Utc>) -> Result<MaintenanceReport> {
        let fingerprints = self.store.imported_fingerprints()?;
        info!(
            keys = fingerprints.len(),
            dry_run = opts.dry_run,
            automatic = opts.automatic,
            "starting key maintenance"
        );

        let mut report = MaintenanceReport::default();
        for fingerprint in fingerprints {
            let outcome = self.process(&fingerprint, opts, now)?;
            if let KeyAction::Failed { reason } = &outcome.action {
                warn!(fingerprint = %fingerprint.hex(), %reason, "key maintenance failed");
            }
            report.outcomes.push(outcome);
        }

        info!(
            rotated = report.count_rotated(),
            failed = report.failures().count(),
            "key maintenance finished"
        );
        Ok(report)
    }

    fn process(
        &self,
        fingerprint: &Fingerprint,
        opts: &RunOptions,
        now: DateTime<Utc>,
    ) -> Result<KeyOutcome> {
        let outcome = |name: String, state, action| KeyOutcome {
            fingerprint: *fingerprint,
            name,
            state,
            action,
        };

        if opts.automatic && !self.config.rotates_automatically(fingerprint) {
            debug!(fingerprint = %fingerprint.hex(), "automatic rotation disabled for key");
            return Ok(outcome(
                fingerprint.to_string(),
                None,
                KeyAction::Skipped {
                    reason: "automatic rotation is disabled for this key".into(),
                },
            ));
        }

        let key = match self.keyring.key_metadata(fingerprint) {
            Ok(key) => key,
            Err(e) => {
                return Ok(outcome(
                    fingerprint.to_string(),
                    None,
                    KeyAction::Failed {
                        reason: e.to_string(),
                    },
                ));
            }
        };
        let name = key.display_name();

        let last_rotated = self.store.last(ROTATE_ACTION, fingerprint)?;
        let state = classify(
            key.expires,
            key.subkey_expiry(),
            last_rotated,
            now,
            self.policy(),
        );
        debug!(fingerprint = %fingerprint.hex(), state = state.as_str(), "classified key");

        if !state.needs_rotation() {
            return Ok(outcome(name, Some(state), KeyAction::NoAction));
        }

        if !self.store.is_older_than(
            ROTATE_ACTION,
            fingerprint,
            self.policy().min_rotation_interval(),
            now,
        )? {
            return Ok(outcome(
                name,
                Some(state),
                KeyAction::Skipped {
                    reason: format!(
                        "rotated less than {} hours ago",
                        self.policy().min_rotation_interval_hours
                    ),
                },
            ));
        }

        let new_expiry = self.policy().next_expiry(now);
        if opts.dry_run {
            return Ok(outcome(name, Some(state), KeyAction::WouldRotate { new_expiry }));
        }

        let action = match self
            .keyring
            .rotate(fingerprint, new_expiry)
            .and_then(|()| self.store.record_last(ROTATE_ACTION, fingerprint, now))
        {
            Ok(()) => {
                info!(fingerprint = %fingerprint.hex(), %new_expiry, "rotated key");
                KeyAction::Rotated { new_expiry }
            }
            Err(e) => KeyAction::Failed {
                reason: e.to_string(),
            },
        };
        Ok(outcome(name, Some(state), action))
    }
}
