use uuid::Uuid;

use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::managed_key::ManagedKey;

/// Anything the key database can record an action against.
///
/// The database only ever sees the derived `namespace:canonical` string, so
/// a fingerprint and a key carrying that fingerprint share one record.
pub trait ActionSubject {
    /// Groups subjects of the same kind, e.g. `key` or `team`.
    fn namespace(&self) -> &str;

    /// Stable string form of this subject, or `None` if it has none.
    fn canonical(&self) -> Option<String>;
}

impl<T: ActionSubject + ?Sized> ActionSubject for &T {
    fn namespace(&self) -> &str {
        (**self).namespace()
    }

    fn canonical(&self) -> Option<String> {
        (**self).canonical()
    }
}

impl ActionSubject for Fingerprint {
    fn namespace(&self) -> &str {
        "key"
    }

    fn canonical(&self) -> Option<String> {
        Some(self.uri())
    }
}

impl ActionSubject for ManagedKey {
    fn namespace(&self) -> &str {
        "key"
    }

    fn canonical(&self) -> Option<String> {
        self.fingerprint.canonical()
    }
}

impl ActionSubject for Uuid {
    fn namespace(&self) -> &str {
        "team"
    }

    fn canonical(&self) -> Option<String> {
        Some(self.hyphenated().to_string())
    }
}
