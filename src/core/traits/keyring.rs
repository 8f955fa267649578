use chrono::{DateTime, Utc};

use crate::core::errors::Result;
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::managed_key::ManagedKey;

/// Port for the keyring that actually holds the key material.
///
/// Implementations live in `adapters::keyring` (e.g. GpgKeyring).
/// Every call is fallible and treated as a per-key failure by callers.
pub trait Keyring: Send + Sync {
    /// All secret keys available in the keyring.
    fn list_secret_keys(&self) -> Result<Vec<ManagedKey>>;

    /// Live metadata for a single secret key.
    fn key_metadata(&self, fingerprint: &Fingerprint) -> Result<ManagedKey>;

    /// Exactly one ASCII-armored public key.
    fn export_public_key(&self, fingerprint: &Fingerprint) -> Result<String>;

    fn import_armored_key(&self, armored: &str) -> Result<()>;

    /// Move the expiry of the primary key and all its subkeys to `new_expiry`.
    fn rotate(&self, fingerprint: &Fingerprint, new_expiry: DateTime<Utc>) -> Result<()>;

    /// Generate a new key pair for `email`, initially without a passphrase.
    fn generate_key(&self, email: &str, expiry: DateTime<Utc>) -> Result<Fingerprint>;

    /// Protect an existing secret key with `passphrase`.
    fn set_passphrase(&self, fingerprint: &Fingerprint, passphrase: &str) -> Result<()>;
}
