//! Parser for GnuPG's machine-readable `--with-colons` key listings.
//!
//! Only the records Keyward needs are read: `sec`/`pub` (primary key),
//! `ssb`/`sub` (subkeys), the `fpr` line that follows the primary key and
//! `uid` lines. Field numbers below are 1-based, as in GnuPG's DETAILS doc.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::core::errors::{KeywardError, Result};
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::managed_key::{ManagedKey, Subkey};

const FIELD_VALIDITY: usize = 1;
const FIELD_KEY_ID: usize = 4;
const FIELD_CREATED: usize = 5;
const FIELD_EXPIRES: usize = 6;
const FIELD_USER_ID: usize = 9;
const FIELD_CAPABILITIES: usize = 11;

/// Key being assembled while walking the listing.
struct Partial {
    fingerprint: Option<Fingerprint>,
    created: DateTime<Utc>,
    expires: Option<DateTime<Utc>>,
    subkeys: Vec<(Subkey, bool)>,
    uids: Vec<String>,
    awaiting_primary_fpr: bool,
}

impl Partial {
    fn finish(self) -> Result<ManagedKey> {
        let fingerprint = self.fingerprint.ok_or_else(|| KeywardError::Keyring {
            reason: "key listing has a primary key without a fingerprint".into(),
        })?;

        // Newest usable encryption subkey, as GnuPG itself would pick.
        let encryption_subkey = self
            .subkeys
            .into_iter()
            .filter(|(_, usable_for_encryption)| *usable_for_encryption)
            .map(|(subkey, _)| subkey)
            .max_by_key(|subkey| subkey.created);

        Ok(ManagedKey {
            fingerprint,
            created: self.created,
            expires: self.expires,
            encryption_subkey,
            uids: self.uids,
        })
    }
}

/// Parse the output of `gpg --with-colons --fixed-list-mode --list-[secret-]keys`.
pub fn parse_key_listing(output: &str) -> Result<Vec<ManagedKey>> {
    let mut keys = Vec::new();
    let mut current: Option<Partial> = None;

    for line in output.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        let field = |i: usize| fields.get(i).copied().unwrap_or("");

        match field(0) {
            "sec" | "pub" => {
                if let Some(done) = current.take() {
                    keys.push(done.finish()?);
                }
                current = Some(Partial {
                    fingerprint: None,
                    created: parse_timestamp(field(FIELD_CREATED))?.ok_or_else(|| {
                        KeywardError::Keyring {
                            reason: format!("primary key without creation time: {line}"),
                        }
                    })?,
                    expires: parse_timestamp(field(FIELD_EXPIRES))?,
                    subkeys: Vec::new(),
                    uids: Vec::new(),
                    awaiting_primary_fpr: true,
                });
            }
            "fpr" => {
                if let Some(key) = current.as_mut()
                    && key.awaiting_primary_fpr
                {
                    key.fingerprint = Some(Fingerprint::parse(field(FIELD_USER_ID))?);
                    key.awaiting_primary_fpr = false;
                }
            }
            "uid" => {
                if let Some(key) = current.as_mut()
                    && !is_revoked_or_expired(field(FIELD_VALIDITY))
                {
                    key.uids.push(unescape(field(FIELD_USER_ID)));
                }
            }
            "ssb" | "sub" => {
                if let Some(key) = current.as_mut() {
                    key.awaiting_primary_fpr = false;
                    let created = parse_timestamp(field(FIELD_CREATED))?.unwrap_or(key.created);
                    let usable = field(FIELD_CAPABILITIES).contains('e')
                        && !is_revoked_or_expired(field(FIELD_VALIDITY));
                    key.subkeys.push((
                        Subkey {
                            key_id: field(FIELD_KEY_ID).to_string(),
                            created,
                            expires: parse_timestamp(field(FIELD_EXPIRES))?,
                        },
                        usable,
                    ));
                }
            }
            _ => {}
        }
    }

    if let Some(done) = current.take() {
        keys.push(done.finish()?);
    }
    Ok(keys)
}

/// Parse a listing timestamp: seconds since the epoch, or an ISO 8601
/// basic-format time (`20260620T163500`) when `--fixed-list-mode` is off.
/// An empty field means "not set".
fn parse_timestamp(raw: &str) -> Result<Option<DateTime<Utc>>> {
    if raw.is_empty() {
        return Ok(None);
    }

    if let Ok(secs) = raw.parse::<i64>() {
        return Utc
            .timestamp_opt(secs, 0)
            .single()
            .map(Some)
            .ok_or_else(|| bad_timestamp(raw));
    }

    NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|_| bad_timestamp(raw))
}

fn bad_timestamp(raw: &str) -> KeywardError {
    KeywardError::Keyring {
        reason: format!("unrecognised timestamp in key listing: '{raw}'"),
    }
}

fn is_revoked_or_expired(validity: &str) -> bool {
    matches!(validity, "r" | "e")
}

/// Undo GnuPG's C-style `\xNN` escaping of colons and control characters.
fn unescape(raw: &str) -> String {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut rest = raw.as_bytes();

    while let Some((&b, tail)) = rest.split_first() {
        if b == b'\\'
            && tail.first() == Some(&b'x')
            && let Some(hex) = tail.get(1..3)
            && let Ok(value) = u8::from_str_radix(&String::from_utf8_lossy(hex), 16)
        {
            bytes.push(value);
            rest = &tail[3..];
            continue;
        }
        bytes.push(b);
        rest = tail;
    }

    String::from_utf8_lossy(&bytes).into_owned()
}
