use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::errors::{KeywardError, Result};
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::store_records::{ImportRecord, JoinRequestRecord, StoreDocument};
use crate::core::traits::action_subject::ActionSubject;

/// The key database: a single JSON document per profile.
///
/// Every operation loads the whole file, and every mutation rewrites it in
/// full through a temporary file that is renamed over the original, so
/// readers see either the old or the new document. Within one process the
/// read-modify-write cycle is serialized by `lock`.
///
/// Example `db.json`:
/// ```text
/// {
///     "keys_imported": [
///         { "fingerprint": "AB01AB01AB01AB01AB01AB01AB01AB01AB01AB01" }
///     ],
///     "last_actions": {
///         "rotate:key:OPENPGP4FPR:AB01AB01AB01AB01AB01AB01AB01AB01AB01AB01": "2026-06-20T16:35:00Z"
///     },
///     "join_requests": []
/// }
/// ```
pub struct JsonStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    /// File name of the database inside a profile directory.
    pub const FILE_NAME: &'static str = "db.json";

    /// Open the database living in `profile_dir`. Nothing is read yet.
    pub fn new(profile_dir: &Path) -> Self {
        Self::with_path(profile_dir.join(Self::FILE_NAME))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Return the file path this store reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ─── Imported keys ───────────────────────────────────────────

    /// Record that `fingerprint` is managed by Keyward. Recording it again
    /// leaves the database as it was.
    pub fn record_import(&self, fingerprint: &Fingerprint) -> Result<()> {
        self.update(|doc| {
            doc.keys_imported.push(ImportRecord::new(*fingerprint));
            Ok(())
        })?;
        info!(fingerprint = %fingerprint, "recorded key as managed");
        Ok(())
    }

    /// Fingerprints under management, in the order they were first recorded.
    pub fn imported_fingerprints(&self) -> Result<Vec<Fingerprint>> {
        self.read(|doc| doc.keys_imported.iter().map(|r| r.fingerprint).collect())
    }

    // ─── Last action times ───────────────────────────────────────

    /// Record that `verb` was last performed on `subject` at `at`,
    /// replacing any earlier time.
    pub fn record_last<S>(&self, verb: &str, subject: &S, at: DateTime<Utc>) -> Result<()>
    where
        S: ActionSubject + ?Sized,
    {
        let key = action_key(verb, subject)?;
        self.update(|doc| {
            doc.last_actions.insert(key.clone(), at);
            Ok(())
        })?;
        debug!(%key, %at, "recorded last action");
        Ok(())
    }

    /// When `verb` was last performed on `subject`, if ever.
    pub fn last<S>(&self, verb: &str, subject: &S) -> Result<Option<DateTime<Utc>>>
    where
        S: ActionSubject + ?Sized,
    {
        let key = action_key(verb, subject)?;
        self.read(|doc| doc.last_actions.get(&key).copied())
    }

    /// Whether `verb` was last performed on `subject` at least `max_age`
    /// before `now`. An action that never happened counts as infinitely old.
    pub fn is_older_than<S>(
        &self,
        verb: &str,
        subject: &S,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool>
    where
        S: ActionSubject + ?Sized,
    {
        Ok(match self.last(verb, subject)? {
            Some(at) => now - at >= max_age,
            None => true,
        })
    }

    // ─── Requests to join teams ──────────────────────────────────

    // No command records requests yet; joining a team happens elsewhere.
    #[allow(dead_code)]
    pub fn record_join_request(
        &self,
        team_uuid: Uuid,
        team_name: &str,
        fingerprint: &Fingerprint,
        requested_at: DateTime<Utc>,
    ) -> Result<()> {
        self.update(|doc| {
            doc.join_requests.push(JoinRequestRecord {
                team_uuid,
                team_name: team_name.to_string(),
                fingerprint: *fingerprint,
                requested_at,
                extra: Default::default(),
            });
            Ok(())
        })?;
        info!(team = %team_uuid, fingerprint = %fingerprint, "recorded request to join team");
        Ok(())
    }

    /// Requests to join teams, keeping only the newest one per
    /// (team, fingerprint) pair. Newest first.
    pub fn join_requests(&self) -> Result<Vec<JoinRequestRecord>> {
        self.read(|doc| latest_join_requests(&doc.join_requests))
    }

    /// The newest request `fingerprint` made to join `team_uuid`, if any.
    pub fn existing_join_request(
        &self,
        team_uuid: Uuid,
        fingerprint: &Fingerprint,
    ) -> Result<Option<JoinRequestRecord>> {
        Ok(self
            .join_requests()?
            .into_iter()
            .find(|r| r.matches(team_uuid, fingerprint)))
    }

    /// Delete every request `fingerprint` made to join `team_uuid`.
    pub fn delete_join_request(&self, team_uuid: Uuid, fingerprint: &Fingerprint) -> Result<()> {
        self.update(|doc| {
            let before = doc.join_requests.len();
            doc.join_requests.retain(|r| !r.matches(team_uuid, fingerprint));
            debug!(
                team = %team_uuid,
                fingerprint = %fingerprint,
                deleted = before - doc.join_requests.len(),
                "deleted requests to join team"
            );
            Ok(())
        })
    }

    // ─── Load / save ─────────────────────────────────────────────

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, f: impl FnOnce(&StoreDocument) -> T) -> Result<T> {
        let _guard = self.guard();
        let doc = self.load()?;
        Ok(f(&doc))
    }

    fn update(&self, f: impl FnOnce(&mut StoreDocument) -> Result<()>) -> Result<()> {
        let _guard = self.guard();
        let mut doc = self.load()?;
        f(&mut doc)?;
        doc.keys_imported = dedup_imports(doc.keys_imported);
        self.save(&doc)
    }

    /// Read the whole document. A missing or blank file is an empty database.
    fn load(&self) -> Result<StoreDocument> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoreDocument::default()),
            Err(e) => return Err(self.error(format!("cannot read file: {e}"))),
        };

        if content.trim().is_empty() {
            return Ok(StoreDocument::default());
        }

        let mut doc: StoreDocument = serde_json::from_str(&content)
            .map_err(|e| self.error(format!("malformed JSON: {e}")))?;
        doc.keys_imported = dedup_imports(doc.keys_imported);
        Ok(doc)
    }

    /// Replace the file atomically with `doc`.
    fn save(&self, doc: &StoreDocument) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .map_err(|e| self.error(format!("cannot create directory: {e}")))?;

        let mut tmp = NamedTempFile::new_in(&parent)
            .map_err(|e| self.error(format!("cannot create temporary file: {e}")))?;

        serde_json::to_writer_pretty(&mut tmp, doc)
            .map_err(|e| self.error(format!("failed to serialize: {e}")))?;
        writeln!(tmp)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.error(format!("failed to write: {e}")))?;

        tmp.persist(&self.path)
            .map_err(|e| self.error(format!("failed to replace file: {}", e.error)))?;
        Ok(())
    }

    fn error(&self, detail: String) -> KeywardError {
        KeywardError::Store {
            path: self.path.clone(),
            detail,
        }
    }
}

/// Build the `verb:namespace:canonical` key for the last-actions map.
fn action_key<S>(verb: &str, subject: &S) -> Result<String>
where
    S: ActionSubject + ?Sized,
{
    if verb.trim().is_empty() {
        return Err(KeywardError::InvalidArgument {
            detail: "verb can't be empty".into(),
        });
    }

    let namespace = subject.namespace();
    match subject.canonical() {
        Some(canonical) if !canonical.is_empty() && !namespace.is_empty() => {
            Ok(format!("{verb}:{namespace}:{canonical}"))
        }
        _ => Err(KeywardError::InvalidArgument {
            detail: format!("don't know how to derive a stable key for '{namespace}' subject"),
        }),
    }
}

/// Collapse records with equal fingerprints, keeping first-seen order.
fn dedup_imports(records: Vec<ImportRecord>) -> Vec<ImportRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.fingerprint))
        .collect()
}

/// Keep only the newest request per (team, fingerprint), newest first.
///
/// On equal timestamps the record added later wins, and sorts first.
fn latest_join_requests(records: &[JoinRequestRecord]) -> Vec<JoinRequestRecord> {
    let mut latest: Vec<(usize, &JoinRequestRecord)> = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match latest
            .iter_mut()
            .find(|(_, kept)| kept.matches(record.team_uuid, &record.fingerprint))
        {
            Some(slot) if record.requested_at >= slot.1.requested_at => *slot = (index, record),
            Some(_) => {}
            None => latest.push((index, record)),
        }
    }

    latest.sort_by(|(ia, a), (ib, b)| {
        b.requested_at
            .cmp(&a.requested_at)
            .then_with(|| ib.cmp(ia))
    });
    latest.into_iter().map(|(_, r)| r.clone()).collect()
}
