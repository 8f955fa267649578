use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::errors::{KeywardError, Result};

/// Prefix used by the `OPENPGP4FPR:` URI scheme.
const URI_PREFIX: &str = "OPENPGP4FPR:";

/// A 20-byte OpenPGP v4 fingerprint, stored as 40 upper-case hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 40]);

impl Fingerprint {
    /// Parse a fingerprint, accepting any case, embedded whitespace and an
    /// optional `OPENPGP4FPR:` prefix.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || KeywardError::InvalidFingerprint {
            input: input.to_string(),
        };

        let trimmed = input.trim();
        let body = match trimmed.get(..URI_PREFIX.len()) {
            Some(head) if head.eq_ignore_ascii_case(URI_PREFIX) => &trimmed[URI_PREFIX.len()..],
            _ => trimmed,
        };

        let mut digits = [0u8; 40];
        let mut count = 0;
        for c in body.chars().filter(|c| !c.is_whitespace()) {
            if !c.is_ascii_hexdigit() || count == digits.len() {
                return Err(invalid());
            }
            digits[count] = c.to_ascii_uppercase() as u8;
            count += 1;
        }

        if count != digits.len() {
            return Err(invalid());
        }
        Ok(Self(digits))
    }

    /// The 40 hex digits with no spacing, e.g. `AB01AB01...`.
    pub fn hex(&self) -> &str {
        // Only ASCII hex digits are ever stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// The fingerprint as an `OPENPGP4FPR:` URI.
    pub fn uri(&self) -> String {
        format!("{URI_PREFIX}{}", self.hex())
    }

    /// The last 16 hex digits, as GnuPG prints long key IDs.
    pub fn key_id(&self) -> &str {
        &self.hex()[24..]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.hex();
        for (i, group) in (0..10).map(|g| &hex[g * 4..g * 4 + 4]).enumerate() {
            match i {
                0 => {}
                5 => f.write_str("  ")?,
                _ => f.write_str(" ")?,
            }
            f.write_str(group)?;
        }
        Ok(())
    }
}

impl FromStr for Fingerprint {
    type Err = KeywardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
