//! Per-directory sidecar ledger.
//!
//! Every directory of a repository may contain a [`LEDGER_FILE_NAME`] document listing the files
//! stored directly inside it:
//!
//! ```yaml
//! quotas-custom-settings: true
//! quotas-enabled: true
//! quotas-limit: 1048576
//! files:
//!   - guid: 550e8400-e29b-41d4-a716-446655440000
//!     vpath: readme.txt
//!     original-filename: readme.txt
//! ```
//!
//! [`Ledger`] is the in-memory form and performs no I/O. [`LedgerStore`] loads and persists
//! ledgers, applying the configured [`RetryPolicy`] and [`LedgerCache`] mode.

use crate::constants::{
    DEFAULT_LEDGER_BACKOFF_MS, DEFAULT_LEDGER_RETRIES, LEDGER_FILE_NAME, LEDGER_TEMP_FILE_NAME,
};
use crate::{FilesError, FilesResult};
use backon::{BlockingRetryable, ConstantBuilder};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use vfr_types::EntryName;
use vfr_uuid::StableId;

/// One file known to a directory's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct LedgerRecord {
    /// Stable identifier assigned when the record was created
    #[serde(rename = "guid")]
    pub id: StableId,

    /// Logical name, equal to the physical file name inside the directory
    #[serde(rename = "vpath")]
    pub name: EntryName,

    /// Name the file was uploaded under, before any collision renaming
    #[serde(rename = "original-filename")]
    pub original_name: String,
}

impl LedgerRecord {
    pub fn new(id: StableId, name: EntryName, original_name: impl Into<String>) -> Self {
        Self {
            id,
            name,
            original_name: original_name.into(),
        }
    }
}

// Older ledgers may lack `original-filename`; it then defaults to the logical name.
#[derive(Deserialize)]
struct StoredRecord {
    guid: StableId,
    vpath: EntryName,
    #[serde(rename = "original-filename", default)]
    original_filename: Option<String>,
}

impl From<StoredRecord> for LedgerRecord {
    fn from(stored: StoredRecord) -> Self {
        let original_name = stored
            .original_filename
            .unwrap_or_else(|| stored.vpath.to_string());
        Self {
            id: stored.guid,
            name: stored.vpath,
            original_name,
        }
    }
}

/// Quota attributes as stored on a repository root ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaSettings {
    pub custom_settings: bool,
    pub enabled: bool,
    pub limit: i64,
}

impl QuotaSettings {
    /// Resolves the byte ceiling that applies to the repository.
    ///
    /// Repository settings win when `custom_settings` is set; otherwise the manager-wide
    /// defaults apply. A result of zero or less means unlimited.
    pub fn effective_limit(&self, default_enabled: bool, default_limit: i64) -> i64 {
        if self.custom_settings {
            if self.enabled {
                self.limit
            } else {
                0
            }
        } else if default_enabled {
            default_limit
        } else {
            0
        }
    }
}

/// In-memory form of one directory's sidecar ledger.
///
/// Attribute values are kept as raw YAML so a hand-edited, unparseable quota value reads as
/// `false`/`0` instead of invalidating the whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Ledger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quotas_custom_settings: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quotas_enabled: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quotas_limit: Option<Value>,
    #[serde(default)]
    files: Vec<LedgerRecord>,
}

impl Ledger {
    /// Parses a sidecar document, returning `None` when it is not a valid ledger.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(bytes).ok()?;
        if text.trim().is_empty() {
            return Some(Self::default());
        }
        serde_yaml::from_str(text).ok()
    }

    /// Renders the ledger as a YAML document.
    pub fn to_yaml(&self) -> FilesResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[LedgerRecord] {
        &self.files
    }

    pub fn find_by_id(&self, id: StableId) -> Option<&LedgerRecord> {
        self.files.iter().find(|r| r.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&LedgerRecord> {
        self.files.iter().find(|r| r.name.as_str() == name)
    }

    /// Appends a record.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::DuplicateName`] if the logical name is already recorded.
    pub fn add(&mut self, record: LedgerRecord) -> FilesResult<()> {
        if self.find_by_name(record.name.as_str()).is_some() {
            return Err(FilesError::DuplicateName(record.name.into_string()));
        }
        self.files.push(record);
        Ok(())
    }

    /// Checks that `id` is recorded and `new_name` is not used by a different record.
    pub fn assert_can_rename(&self, id: StableId, new_name: &EntryName) -> FilesResult<()> {
        if let Some(other) = self.find_by_name(new_name.as_str()) {
            if other.id != id {
                return Err(FilesError::NameCollision(new_name.to_string()));
            }
        }
        if self.find_by_id(id).is_none() {
            return Err(FilesError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Renames a record. The original name is overwritten with the new name as well.
    pub fn rename(&mut self, id: StableId, new_name: &EntryName) -> FilesResult<()> {
        self.assert_can_rename(id, new_name)?;
        if let Some(record) = self.files.iter_mut().find(|r| r.id == id) {
            record.name = new_name.clone();
            record.original_name = new_name.to_string();
        }
        Ok(())
    }

    /// Removes the record carrying `id`. Returns whether one was removed.
    pub fn delete(&mut self, id: StableId) -> bool {
        let before = self.files.len();
        self.files.retain(|r| r.id != id);
        self.files.len() != before
    }

    pub fn quotas_custom_settings(&self) -> bool {
        flag(self.quotas_custom_settings.as_ref())
    }

    pub fn set_quotas_custom_settings(&mut self, value: bool) {
        self.quotas_custom_settings = Some(Value::Bool(value));
    }

    pub fn quotas_enabled(&self) -> bool {
        flag(self.quotas_enabled.as_ref())
    }

    pub fn set_quotas_enabled(&mut self, value: bool) {
        self.quotas_enabled = Some(Value::Bool(value));
    }

    pub fn quotas_limit(&self) -> i64 {
        match self.quotas_limit.as_ref() {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn set_quotas_limit(&mut self, value: i64) {
        self.quotas_limit = Some(Value::Number(value.into()));
    }

    pub fn quota_settings(&self) -> QuotaSettings {
        QuotaSettings {
            custom_settings: self.quotas_custom_settings(),
            enabled: self.quotas_enabled(),
            limit: self.quotas_limit(),
        }
    }
}

fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Bounded retry for ledger I/O: `max_retries` further attempts, `backoff` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_LEDGER_RETRIES,
            backoff: Duration::from_millis(DEFAULT_LEDGER_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up after the first failure.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Runs `op`, retrying on any I/O error except `NotFound`.
    fn run<T>(&self, path: &Path, op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
        op.retry(
            ConstantBuilder::default()
                .with_delay(self.backoff)
                .with_max_times(self.max_retries),
        )
        .sleep(std::thread::sleep)
        .when(|e: &io::Error| e.kind() != io::ErrorKind::NotFound)
        .notify(|e: &io::Error, delay: Duration| {
            tracing::warn!(
                "ledger I/O on {} failed, retrying in {:?}: {}",
                path.display(),
                delay,
                e
            );
        })
        .call()
    }
}

/// How long a loaded ledger may be reused before it is read from disk again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LedgerCache {
    /// Read the sidecar on every access, observing external edits immediately.
    #[default]
    None,
    /// Reuse a loaded ledger for the given duration.
    Ttl(Duration),
    /// Reuse a loaded ledger for the lifetime of the repository handle.
    Session,
}

/// Ledger I/O behaviour injected into a repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerOptions {
    pub retry: RetryPolicy,
    pub cache: LedgerCache,
}

#[derive(Debug)]
struct CachedLedger {
    ledger: Ledger,
    loaded_at: Instant,
}

/// Loads and persists the ledgers of one repository.
///
/// Writes are always synchronous and write-through; the cache only affects reads.
#[derive(Debug, Default)]
pub(crate) struct LedgerStore {
    options: LedgerOptions,
    cache: Mutex<HashMap<PathBuf, CachedLedger>>,
}

impl LedgerStore {
    pub(crate) fn new(options: LedgerOptions) -> Self {
        Self {
            options,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the ledger of `dir`, honouring the cache mode.
    ///
    /// A missing or malformed sidecar yields an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::CorruptLedger`] if reading the sidecar keeps failing.
    pub(crate) fn load(&self, dir: &Path) -> FilesResult<Ledger> {
        if let Some(ledger) = self.cached(dir) {
            return Ok(ledger);
        }
        let ledger = self.read(dir)?;
        self.remember(dir, &ledger);
        Ok(ledger)
    }

    /// Reads the ledger of `dir` fresh from disk, applies `change` and persists the result if
    /// it differs from what was read.
    pub(crate) fn update<T>(
        &self,
        dir: &Path,
        change: impl FnOnce(&mut Ledger) -> FilesResult<T>,
    ) -> FilesResult<T> {
        let original = self.read(dir)?;
        let mut ledger = original.clone();
        let result = change(&mut ledger)?;
        if ledger != original {
            self.persist(dir, &ledger)?;
        }
        self.remember(dir, &ledger);
        Ok(result)
    }

    /// Drops cached ledgers of `dir` and everything below it.
    pub(crate) fn forget_tree(&self, dir: &Path) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|path, _| !path.starts_with(dir));
    }

    fn read(&self, dir: &Path) -> FilesResult<Ledger> {
        let path = dir.join(LEDGER_FILE_NAME);
        match self.options.retry.run(&path, || fs::read(&path)) {
            Ok(bytes) => Ok(Ledger::parse(&bytes).unwrap_or_else(|| {
                tracing::warn!("ignoring malformed ledger {}", path.display());
                Ledger::default()
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Ledger::default()),
            Err(source) => Err(FilesError::CorruptLedger { path, source }),
        }
    }

    fn persist(&self, dir: &Path, ledger: &Ledger) -> FilesResult<()> {
        let yaml = ledger.to_yaml()?;
        let path = dir.join(LEDGER_FILE_NAME);
        let temp = dir.join(LEDGER_TEMP_FILE_NAME);
        self.options
            .retry
            .run(&path, || {
                fs::write(&temp, yaml.as_bytes())?;
                fs::rename(&temp, &path)
            })
            .map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    FilesError::Io(source)
                } else {
                    FilesError::TransientIo {
                        path: path.clone(),
                        source,
                    }
                }
            })?;
        tracing::debug!(
            "wrote ledger {} ({} records)",
            path.display(),
            ledger.records().len()
        );
        Ok(())
    }

    fn cached(&self, dir: &Path) -> Option<Ledger> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = cache.get(dir)?;
        let fresh = match self.options.cache {
            LedgerCache::None => false,
            LedgerCache::Ttl(ttl) => entry.loaded_at.elapsed() < ttl,
            LedgerCache::Session => true,
        };
        fresh.then(|| entry.ledger.clone())
    }

    fn remember(&self, dir: &Path, ledger: &Ledger) {
        if self.options.cache == LedgerCache::None {
            return;
        }
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).insert(
            dir.to_path_buf(),
            CachedLedger {
                ledger: ledger.clone(),
                loaded_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn name(s: &str) -> EntryName {
        EntryName::new(s).unwrap()
    }

    fn fast_store(cache: LedgerCache) -> LedgerStore {
        LedgerStore::new(LedgerOptions {
            retry: RetryPolicy::none(),
            cache,
        })
    }

    #[test]
    fn test_parse_full_document() {
        let yaml = "\
quotas-custom-settings: true
quotas-enabled: 'True'
quotas-limit: 2048
files:
  - guid: 550e8400-e29b-41d4-a716-446655440000
    vpath: a-1.txt
    original-filename: a.txt
  - guid: 6ba7b810-9dad-11d1-80b4-00c04fd430c8
    vpath: legacy.bin
";
        let ledger = Ledger::parse(yaml.as_bytes()).unwrap();

        assert!(ledger.quotas_custom_settings());
        assert!(ledger.quotas_enabled());
        assert_eq!(ledger.quotas_limit(), 2048);
        assert_eq!(ledger.records().len(), 2);
        assert_eq!(ledger.records()[0].original_name, "a.txt");
        assert_eq!(ledger.records()[1].original_name, "legacy.bin");
    }

    #[test]
    fn test_parse_malformed_is_rejected() {
        assert!(Ledger::parse(b"files: [ {guid: nope, vpath: x} ]").is_none());
        assert!(Ledger::parse(b"\xff\xfe").is_none());
        assert_eq!(Ledger::parse(b"  \n"), Some(Ledger::default()));
    }

    #[test]
    fn test_unparseable_quota_values_read_as_defaults() {
        let ledger =
            Ledger::parse(b"quotas-enabled: maybe\nquotas-limit: lots\nfiles: []\n").unwrap();
        assert!(!ledger.quotas_enabled());
        assert_eq!(ledger.quotas_limit(), 0);
        assert!(!ledger.quotas_custom_settings());
    }

    #[test]
    fn test_add_rejects_duplicate_name() {
        let mut ledger = Ledger::default();
        ledger
            .add(LedgerRecord::new(StableId::new(), name("a.txt"), "a.txt"))
            .unwrap();
        let result = ledger.add(LedgerRecord::new(StableId::new(), name("a.txt"), "a.txt"));
        assert!(matches!(result, Err(FilesError::DuplicateName(n)) if n == "a.txt"));
        assert_eq!(ledger.records().len(), 1);
    }

    #[test]
    fn test_find_by_id_and_name() {
        let mut ledger = Ledger::default();
        let id = StableId::new();
        ledger
            .add(LedgerRecord::new(id, name("b.txt"), "b.txt"))
            .unwrap();

        assert_eq!(ledger.find_by_id(id).unwrap().name.as_str(), "b.txt");
        assert_eq!(ledger.find_by_name("b.txt").unwrap().id, id);
        assert!(ledger.find_by_id(StableId::new()).is_none());
        assert!(ledger.find_by_name("c.txt").is_none());
    }

    #[test]
    fn test_rename_overwrites_original_name() {
        let mut ledger = Ledger::default();
        let id = StableId::new();
        ledger
            .add(LedgerRecord::new(id, name("a-1.txt"), "a.txt"))
            .unwrap();

        ledger.rename(id, &name("b.txt")).unwrap();

        let record = ledger.find_by_id(id).unwrap();
        assert_eq!(record.name.as_str(), "b.txt");
        assert_eq!(record.original_name, "b.txt");
    }

    #[test]
    fn test_rename_collision_and_missing() {
        let mut ledger = Ledger::default();
        let first = StableId::new();
        let second = StableId::new();
        ledger
            .add(LedgerRecord::new(first, name("one"), "one"))
            .unwrap();
        ledger
            .add(LedgerRecord::new(second, name("two"), "two"))
            .unwrap();
        let before = ledger.clone();

        assert!(matches!(
            ledger.rename(first, &name("two")),
            Err(FilesError::NameCollision(_))
        ));
        assert!(matches!(
            ledger.rename(StableId::new(), &name("three")),
            Err(FilesError::NotFound(_))
        ));
        assert_eq!(ledger, before);

        // Renaming a record onto its own name is allowed.
        ledger.rename(first, &name("one")).unwrap();
    }

    #[test]
    fn test_delete_is_noop_for_unknown_id() {
        let mut ledger = Ledger::default();
        let id = StableId::new();
        ledger.add(LedgerRecord::new(id, name("x"), "x")).unwrap();

        assert!(!ledger.delete(StableId::new()));
        assert!(ledger.delete(id));
        assert!(ledger.records().is_empty());
    }

    #[test]
    fn test_effective_limit_two_level_override() {
        let custom = QuotaSettings {
            custom_settings: true,
            enabled: true,
            limit: 100,
        };
        assert_eq!(custom.effective_limit(true, 5000), 100);
        assert_eq!(custom.effective_limit(false, 0), 100);

        let custom_disabled = QuotaSettings {
            enabled: false,
            ..custom
        };
        assert_eq!(custom_disabled.effective_limit(true, 5000), 0);

        let inherited = QuotaSettings::default();
        assert_eq!(inherited.effective_limit(true, 5000), 5000);
        assert_eq!(inherited.effective_limit(false, 5000), 0);
    }

    #[test]
    fn test_store_missing_sidecar_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = fast_store(LedgerCache::None);

        let ledger = store.load(temp.path()).unwrap();

        assert_eq!(ledger, Ledger::default());
        assert!(!temp.path().join(LEDGER_FILE_NAME).exists());
    }

    #[test]
    fn test_store_malformed_sidecar_is_empty() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(LEDGER_FILE_NAME), "<root><file/></root>").unwrap();
        let store = fast_store(LedgerCache::None);

        assert!(store.load(temp.path()).unwrap().records().is_empty());
    }

    #[test]
    fn test_store_update_persists_and_cleans_temp() {
        let temp = TempDir::new().unwrap();
        let store = fast_store(LedgerCache::None);
        let id = StableId::new();

        store
            .update(temp.path(), |ledger| {
                ledger.add(LedgerRecord::new(id, name("doc.pdf"), "doc.pdf"))
            })
            .unwrap();

        let text = fs::read_to_string(temp.path().join(LEDGER_FILE_NAME)).unwrap();
        assert!(text.contains(&id.to_string()));
        assert!(text.contains("vpath: doc.pdf"));
        assert!(text.contains("original-filename: doc.pdf"));
        assert!(!temp.path().join(LEDGER_TEMP_FILE_NAME).exists());

        let reloaded = store.load(temp.path()).unwrap();
        assert_eq!(reloaded.find_by_id(id).unwrap().name.as_str(), "doc.pdf");
    }

    #[test]
    fn test_store_update_without_change_does_not_write() {
        let temp = TempDir::new().unwrap();
        let store = fast_store(LedgerCache::None);

        let found = store
            .update(temp.path(), |ledger| Ok(ledger.find_by_name("x").is_some()))
            .unwrap();

        assert!(!found);
        assert!(!temp.path().join(LEDGER_FILE_NAME).exists());
    }

    #[test]
    fn test_store_update_error_leaves_disk_untouched() {
        let temp = TempDir::new().unwrap();
        let store = fast_store(LedgerCache::None);

        let result = store.update(temp.path(), |ledger| {
            ledger.rename(StableId::new(), &name("y"))
        });

        assert!(matches!(result, Err(FilesError::NotFound(_))));
        assert!(!temp.path().join(LEDGER_FILE_NAME).exists());
    }

    #[test]
    fn test_store_quota_setters_persist() {
        let temp = TempDir::new().unwrap();
        let store = fast_store(LedgerCache::None);

        store
            .update(temp.path(), |ledger| {
                ledger.set_quotas_custom_settings(true);
                ledger.set_quotas_enabled(true);
                ledger.set_quotas_limit(4096);
                Ok(())
            })
            .unwrap();

        let text = fs::read_to_string(temp.path().join(LEDGER_FILE_NAME)).unwrap();
        assert!(text.contains("quotas-custom-settings: true"));
        assert!(text.contains("quotas-limit: 4096"));
        assert_eq!(
            store.load(temp.path()).unwrap().quota_settings(),
            QuotaSettings {
                custom_settings: true,
                enabled: true,
                limit: 4096,
            }
        );
    }

    #[test]
    fn test_uncached_store_sees_external_edits() {
        let temp = TempDir::new().unwrap();
        let store = fast_store(LedgerCache::None);
        assert!(store.load(temp.path()).unwrap().records().is_empty());

        let id = StableId::new();
        fs::write(
            temp.path().join(LEDGER_FILE_NAME),
            format!("files:\n  - guid: {id}\n    vpath: external.txt\n"),
        )
        .unwrap();

        assert!(store.load(temp.path()).unwrap().find_by_id(id).is_some());
    }

    #[test]
    fn test_session_store_ignores_external_edits() {
        let temp = TempDir::new().unwrap();
        let store = fast_store(LedgerCache::Session);
        assert!(store.load(temp.path()).unwrap().records().is_empty());

        fs::write(
            temp.path().join(LEDGER_FILE_NAME),
            format!("files:\n  - guid: {}\n    vpath: external.txt\n", StableId::new()),
        )
        .unwrap();
        assert!(store.load(temp.path()).unwrap().records().is_empty());

        store.forget_tree(temp.path());
        assert_eq!(store.load(temp.path()).unwrap().records().len(), 1);
    }

    #[test]
    fn test_ttl_store_expires() {
        let temp = TempDir::new().unwrap();
        let store = fast_store(LedgerCache::Ttl(Duration::ZERO));
        assert!(store.load(temp.path()).unwrap().records().is_empty());

        fs::write(
            temp.path().join(LEDGER_FILE_NAME),
            format!("files:\n  - guid: {}\n    vpath: later.txt\n", StableId::new()),
        )
        .unwrap();

        assert_eq!(store.load(temp.path()).unwrap().records().len(), 1);
    }

    #[test]
    fn test_session_store_is_write_through() {
        let temp = TempDir::new().unwrap();
        let store = fast_store(LedgerCache::Session);
        assert!(store.load(temp.path()).unwrap().records().is_empty());

        let id = StableId::new();
        store
            .update(temp.path(), |ledger| {
                ledger.add(LedgerRecord::new(id, name("new.txt"), "new.txt"))
            })
            .unwrap();

        assert!(store.load(temp.path()).unwrap().find_by_id(id).is_some());
    }

    #[test]
    fn test_retry_gives_up_after_budget() {
        let temp = TempDir::new().unwrap();
        let policy = RetryPolicy {
            max_retries: 2,
            backoff: Duration::ZERO,
        };
        let mut attempts = 0;

        let result: io::Result<()> = policy.run(temp.path(), || {
            attempts += 1;
            Err(io::Error::other("busy"))
        });

        assert!(result.is_err());
        assert_eq!(attempts, 3);
    }

    #[test]
    fn test_retry_recovers_from_transient_error() {
        let temp = TempDir::new().unwrap();
        let policy = RetryPolicy {
            max_retries: 3,
            backoff: Duration::ZERO,
        };
        let mut attempts = 0;

        let result = policy.run(temp.path(), || {
            attempts += 1;
            if attempts < 3 {
                Err(io::Error::other("sharing violation"))
            } else {
                Ok(attempts)
            }
        });

        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_retry_skips_not_found() {
        let temp = TempDir::new().unwrap();
        let mut attempts = 0;

        let result: io::Result<()> = RetryPolicy::default().run(temp.path(), || {
            attempts += 1;
            Err(io::Error::from(io::ErrorKind::NotFound))
        });

        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_store_failed_write_is_transient_io() {
        let temp = TempDir::new().unwrap();
        // A non-empty directory in place of the temp file makes every write fail.
        fs::create_dir_all(temp.path().join(LEDGER_TEMP_FILE_NAME).join("inner")).unwrap();
        let store = fast_store(LedgerCache::None);
        let id = StableId::new();

        let result = store.update(temp.path(), |ledger| {
            ledger.add(LedgerRecord::new(id, name("a.txt"), "a.txt"))
        });

        match result {
            Err(FilesError::TransientIo { path, .. }) => {
                assert_eq!(path, temp.path().join(LEDGER_FILE_NAME));
            }
            other => panic!("expected TransientIo, got {other:?}"),
        }
        assert!(!temp.path().join(LEDGER_FILE_NAME).exists());
    }

    #[test]
    fn test_store_unreadable_sidecar_is_corrupt() {
        let temp = TempDir::new().unwrap();
        // A directory in place of the sidecar makes every read fail with a non-NotFound error.
        fs::create_dir(temp.path().join(LEDGER_FILE_NAME)).unwrap();
        let store = fast_store(LedgerCache::None);

        let result = store.load(temp.path());

        assert!(matches!(result, Err(FilesError::CorruptLedger { .. })));
    }
}
