//! Repository: the root folder of one namespace, carrying quota policy.

use crate::engine::{AddFileMode, StorageEngine};
use crate::entry::{EntryKind, EntryOps, File, FileOps, FolderOps, VirtualPath};
use crate::ledger::LedgerOptions;
use crate::{FilesError, FilesResult};
use std::path::Path;
use std::sync::Arc;
use vfr_types::EntryName;
use vfr_uuid::StableId;

/// Manager-wide quota defaults, used when a repository has no custom settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaDefaults {
    pub enabled: bool,
    pub limit: i64,
}

/// Handle to one repository rooted at `<root_directory>/<name>`.
///
/// Cloning is cheap; all clones share the same ledger cache.
#[derive(Debug, Clone)]
pub struct Repository {
    inner: Arc<RepositoryInner>,
}

#[derive(Debug)]
struct RepositoryInner {
    name: EntryName,
    root: VirtualPath,
    engine: StorageEngine,
}

impl Repository {
    /// Opens the repository `name` below `root_directory`.
    ///
    /// Nothing is created or verified on disk; the repository directory appears with the first
    /// stored file, folder or quota setting.
    pub fn open(
        name: EntryName,
        root_directory: &Path,
        defaults: QuotaDefaults,
        options: LedgerOptions,
    ) -> Self {
        let engine = StorageEngine::new(root_directory.join(name.as_str()), defaults, options);
        Self {
            inner: Arc::new(RepositoryInner {
                name,
                root: VirtualPath::root(),
                engine,
            }),
        }
    }

    /// Physical directory holding this repository.
    pub fn root_directory(&self) -> &Path {
        self.inner.engine.root_directory()
    }

    /// Whether `other` addresses the same physical repository.
    pub fn same_as(&self, other: &Repository) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.root_directory() == other.root_directory()
    }

    pub fn quotas_custom_settings(&self) -> FilesResult<bool> {
        Ok(self.inner.engine.quota_settings()?.custom_settings)
    }

    pub fn set_quotas_custom_settings(&self, value: bool) -> FilesResult<()> {
        self.inner
            .engine
            .update_quota_settings(|ledger| ledger.set_quotas_custom_settings(value))
    }

    pub fn quotas_enabled(&self) -> FilesResult<bool> {
        Ok(self.inner.engine.quota_settings()?.enabled)
    }

    pub fn set_quotas_enabled(&self, value: bool) -> FilesResult<()> {
        self.inner
            .engine
            .update_quota_settings(|ledger| ledger.set_quotas_enabled(value))
    }

    pub fn quotas_limit(&self) -> FilesResult<i64> {
        Ok(self.inner.engine.quota_settings()?.limit)
    }

    pub fn set_quotas_limit(&self, value: i64) -> FilesResult<()> {
        self.inner
            .engine
            .update_quota_settings(|ledger| ledger.set_quotas_limit(value))
    }

    /// The byte ceiling in force; zero or less means unlimited.
    pub fn effective_quotas_limit(&self) -> FilesResult<i64> {
        self.inner.engine.effective_quotas_limit()
    }

    /// Copies `file` (typically from another repository) into this repository's root under its
    /// original name, picking a fresh name on collision.
    pub fn import(&self, file: &File) -> FilesResult<StableId> {
        let reader = file.open()?;
        self.add_file(file.original_name(), reader, AddFileMode::ChangeName)
    }

    pub(crate) fn engine(&self) -> &StorageEngine {
        &self.inner.engine
    }
}

impl EntryOps for Repository {
    fn kind(&self) -> EntryKind {
        EntryKind::Repository
    }

    fn repository(&self) -> &Repository {
        self
    }

    fn virtual_path(&self) -> &VirtualPath {
        &self.inner.root
    }

    fn id(&self) -> Option<StableId> {
        None
    }

    fn name(&self) -> &str {
        self.inner.name.as_str()
    }

    /// Removes the whole repository directory.
    fn delete(&self, ignore_errors: bool) -> FilesResult<()> {
        tracing::info!("deleting repository {}", self.inner.name);
        self.inner.engine.delete_folder(&self.inner.root, ignore_errors)
    }

    fn rename(&self, _new_name: &str) -> FilesResult<()> {
        Err(FilesError::NotImplemented("renaming a repository"))
    }
}

impl FolderOps for Repository {}
