use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::models::fingerprint::Fingerprint;

/// Fields of a record this version does not know about, kept so a rewrite
/// hands them back unchanged.
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;

/// Marks a fingerprint as being under Keyward's management.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub fingerprint: Fingerprint,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl ImportRecord {
    pub fn new(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            extra: ExtraFields::new(),
        }
    }
}

/// A request made by one of our keys to join a team's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequestRecord {
    pub team_uuid: Uuid,
    #[serde(default)]
    pub team_name: String,
    pub fingerprint: Fingerprint,
    pub requested_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl JoinRequestRecord {
    /// Whether this request was made by `fingerprint` to join `team_uuid`.
    pub fn matches(&self, team_uuid: Uuid, fingerprint: &Fingerprint) -> bool {
        self.team_uuid == team_uuid && &self.fingerprint == fingerprint
    }
}

/// The whole on-disk document behind the key database (`db.json`).
///
/// Every field defaults to empty so a partial or older file still loads,
/// and fields this version does not know about are carried through `extra`
/// untouched when the document is written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub keys_imported: Vec<ImportRecord>,
    #[serde(default)]
    pub last_actions: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub join_requests: Vec<JoinRequestRecord>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}
