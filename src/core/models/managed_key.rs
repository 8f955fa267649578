use chrono::{DateTime, Utc};

use crate::core::models::fingerprint::Fingerprint;

/// The encryption-capable subkey of a managed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subkey {
    pub key_id: String,
    pub created: DateTime<Utc>,
    pub expires: Option<DateTime<Utc>>,
}

/// A key under Keyward's management, as currently reported by the keyring.
///
/// Never persisted: metadata is fetched live from GnuPG on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedKey {
    pub fingerprint: Fingerprint,
    pub created: DateTime<Utc>,
    pub expires: Option<DateTime<Utc>>,
    pub encryption_subkey: Option<Subkey>,
    pub uids: Vec<String>,
}

impl ManagedKey {
    /// Expiry of the subkey used for encryption.
    ///
    /// Keys without a separate encryption subkey are judged on the
    /// primary key's expiry alone.
    pub fn subkey_expiry(&self) -> Option<DateTime<Utc>> {
        match &self.encryption_subkey {
            Some(subkey) => subkey.expires,
            None => self.expires,
        }
    }

    /// Primary email address, taken from the first user ID that has one.
    pub fn email(&self) -> Option<&str> {
        self.uids.iter().find_map(|uid| {
            let start = uid.find('<')?;
            let end = uid[start..].find('>')? + start;
            Some(&uid[start + 1..end])
        })
    }

    /// A short label for tables and log lines: the email if known,
    /// otherwise the fingerprint.
    pub fn display_name(&self) -> String {
        self.email()
            .map(str::to_string)
            .unwrap_or_else(|| self.fingerprint.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ManagedKey {
        ManagedKey {
            fingerprint: Fingerprint::parse("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA").unwrap(),
            created: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            expires: Some(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()),
            encryption_subkey: None,
            uids: vec!["Jane Doe <jane@example.com>".into()],
        }
    }

    #[test]
    fn subkey_expiry_falls_back_to_primary() {
        let key = sample();
        assert_eq!(key.subkey_expiry(), key.expires);
    }

    #[test]
    fn subkey_expiry_uses_encryption_subkey() {
        let mut key = sample();
        key.encryption_subkey = Some(Subkey {
            key_id: "0123456789ABCDEF".into(),
            created: key.created,
            expires: None,
        });
        assert_eq!(key.subkey_expiry(), None);
    }

    #[test]
    fn email_is_extracted_from_uid() {
        assert_eq!(sample().email(), Some("jane@example.com"));
        assert_eq!(sample().display_name(), "jane@example.com");
    }

    #[test]
    fn display_name_without_email_is_fingerprint() {
        let mut key = sample();
        key.uids = vec!["Jane Doe".into()];
        assert_eq!(key.email(), None);
        assert_eq!(key.display_name(), key.fingerprint.to_string());
    }
}
