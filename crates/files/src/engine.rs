//! Filesystem storage engine.
//!
//! [`StorageEngine`] reconciles the physical directory tree of one repository with the sidecar
//! ledgers inside it. It works purely on [`VirtualPath`]s and ledger records; the entry views
//! in [`crate::entry`] wrap its results.

use crate::constants::{LEDGER_FILE_NAME, LEDGER_TEMP_FILE_NAME};
use crate::entry::VirtualPath;
use crate::ledger::{Ledger, LedgerOptions, LedgerRecord, LedgerStore, QuotaSettings};
use crate::repository::QuotaDefaults;
use crate::{FilesError, FilesResult};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use vfr_types::EntryName;
use vfr_uuid::StableId;

/// How to handle adding a file whose name is already taken by a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddFileMode {
    /// Replace the existing bytes, keeping the existing identifier.
    Overwrite,
    /// Fail with [`FilesError::AlreadyExists`].
    Throw,
    /// Store under `stem-1.ext`, `stem-2.ext`, ... instead.
    ChangeName,
}

/// A virtual path resolved against the physical tree and the ledgers.
#[derive(Debug, Clone)]
pub(crate) enum Resolved {
    Folder(VirtualPath),
    File {
        folder: VirtualPath,
        record: LedgerRecord,
    },
}

#[derive(Debug)]
pub(crate) struct StorageEngine {
    root_directory: PathBuf,
    defaults: QuotaDefaults,
    ledgers: LedgerStore,
}

impl StorageEngine {
    pub(crate) fn new(root_directory: PathBuf, defaults: QuotaDefaults, options: LedgerOptions) -> Self {
        Self {
            root_directory,
            defaults,
            ledgers: LedgerStore::new(options),
        }
    }

    pub(crate) fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    pub(crate) fn real_path(&self, path: &VirtualPath) -> PathBuf {
        path.segments()
            .iter()
            .fold(self.root_directory.clone(), |acc, s| acc.join(s.as_str()))
    }

    /// Ledger records of `folder`, in insertion order.
    pub(crate) fn records(&self, folder: &VirtualPath) -> FilesResult<Vec<LedgerRecord>> {
        Ok(self
            .ledgers
            .load(&self.real_path(folder))?
            .records()
            .to_vec())
    }

    /// Names of the physical subdirectories of `folder`, in directory-listing order.
    pub(crate) fn subfolders(&self, folder: &VirtualPath) -> FilesResult<Vec<EntryName>> {
        let dir = self.real_path(folder);
        let iter = match fs::read_dir(&dir) {
            Ok(it) => it,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in iter {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            match entry.file_name().into_string().map(EntryName::new) {
                Ok(Ok(name)) => names.push(name),
                _ => tracing::warn!(
                    "skipping folder with unsupported name: {}",
                    entry.path().display()
                ),
            }
        }
        Ok(names)
    }

    pub(crate) fn find_by_id(
        &self,
        folder: &VirtualPath,
        id: StableId,
    ) -> FilesResult<Option<LedgerRecord>> {
        Ok(self
            .ledgers
            .load(&self.real_path(folder))?
            .find_by_id(id)
            .cloned())
    }

    /// Depth-first identifier search, subfolders visited in [`Self::subfolders`] order.
    pub(crate) fn find_by_id_recursive(
        &self,
        folder: &VirtualPath,
        id: StableId,
    ) -> FilesResult<Option<(VirtualPath, LedgerRecord)>> {
        if let Some(record) = self.find_by_id(folder, id)? {
            return Ok(Some((folder.clone(), record)));
        }
        for name in self.subfolders(folder)? {
            if let Some(found) = self.find_by_id_recursive(&folder.join(name), id)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Resolves a slash-delimited path relative to `from`, or to the repository root when it
    /// starts with `/`.
    pub(crate) fn resolve(&self, from: &VirtualPath, path: &str) -> FilesResult<Option<Resolved>> {
        if path.is_empty() {
            return Ok(Some(Resolved::Folder(from.clone())));
        }
        if let Some(rest) = path.strip_prefix('/') {
            return self.resolve(&VirtualPath::root(), rest);
        }

        let mut names = Vec::new();
        for component in path.split('/') {
            if component.is_empty() {
                return Err(FilesError::InvalidArgument(format!(
                    "path '{}' contains an empty element",
                    path
                )));
            }
            names.push(
                EntryName::new(component)
                    .map_err(|e| FilesError::InvalidArgument(e.to_string()))?,
            );
        }

        let Some(last) = names.pop() else {
            return Ok(Some(Resolved::Folder(from.clone())));
        };
        let mut current = from.clone();
        for name in names {
            let candidate = current.join(name);
            if !self.real_path(&candidate).is_dir() {
                return Err(FilesError::PathNotFound(candidate.to_string()));
            }
            current = candidate;
        }

        let candidate = current.join(last.clone());
        if self.real_path(&candidate).is_dir() {
            return Ok(Some(Resolved::Folder(candidate)));
        }
        let ledger = self.ledgers.load(&self.real_path(&current))?;
        Ok(ledger
            .find_by_name(last.as_str())
            .cloned()
            .map(|record| Resolved::File {
                folder: current,
                record,
            }))
    }

    /// Stores the bytes of `reader` as `name` inside `folder` and returns the identifier and
    /// the logical name the file ended up with.
    pub(crate) fn add_file<R: Read>(
        &self,
        folder: &VirtualPath,
        name: &str,
        mut reader: R,
        mode: AddFileMode,
    ) -> FilesResult<(StableId, EntryName)> {
        let requested = validate_name(name)?;
        self.check_quota()?;

        if folder.is_root() {
            fs::create_dir_all(&self.root_directory)?;
        }
        let dir = self.real_path(folder);
        let target = dir.join(requested.as_str());
        if target.is_dir() {
            return Err(FilesError::NameCollision(requested.into_string()));
        }

        let mut logical = requested.clone();
        if target.exists() {
            match mode {
                AddFileMode::Throw => {
                    return Err(FilesError::AlreadyExists(requested.into_string()));
                }
                AddFileMode::Overwrite => {}
                AddFileMode::ChangeName => logical = self.free_name(&dir, &requested)?,
            }
        }

        let physical = dir.join(logical.as_str());
        let mut out = fs::File::create(&physical)?;
        let written = io::copy(&mut reader, &mut out)?;
        out.flush()?;
        drop(out);
        tracing::debug!("wrote {} bytes to {}", written, physical.display());

        // A crash before this point leaves an orphan physical file without a ledger record.
        self.ledgers.update(&dir, |ledger| {
            if let Some(existing) = ledger.find_by_name(logical.as_str()) {
                return Ok((existing.id, logical.clone()));
            }
            let id = StableId::new();
            ledger.add(LedgerRecord::new(id, logical.clone(), requested.as_str()))?;
            Ok((id, logical.clone()))
        })
    }

    /// Creates the subdirectory `name` of `folder` (and the repository root if needed).
    pub(crate) fn make_dir(&self, folder: &VirtualPath, name: &str) -> FilesResult<EntryName> {
        let name = validate_name(name)?;
        let real = self.real_path(&folder.join(name.clone()));
        if real.exists() && !real.is_dir() {
            return Err(FilesError::NameCollision(name.into_string()));
        }
        fs::create_dir_all(&real)?;
        tracing::debug!("created folder {}", real.display());
        Ok(name)
    }

    /// Removes the physical file, then its ledger record regardless of the physical outcome.
    pub(crate) fn delete_file(
        &self,
        folder: &VirtualPath,
        name: &EntryName,
        id: StableId,
        ignore_errors: bool,
    ) -> FilesResult<()> {
        let dir = self.real_path(folder);
        let physical = dir.join(name.as_str());
        match fs::remove_file(&physical) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("deleting {} which has no physical file", physical.display());
            }
            Err(e) if ignore_errors => {
                tracing::warn!("ignoring failure to delete {}: {}", physical.display(), e);
            }
            Err(e) => return Err(e.into()),
        }
        self.ledgers.update(&dir, |ledger| {
            ledger.delete(id);
            Ok(())
        })
    }

    /// Recursively removes the directory at `path`. Folders have no ledger record to clean.
    pub(crate) fn delete_folder(&self, path: &VirtualPath, ignore_errors: bool) -> FilesResult<()> {
        let real = self.real_path(path);
        match fs::remove_dir_all(&real) {
            Ok(()) => {}
            Err(e) if ignore_errors => {
                tracing::warn!("ignoring failure to delete {}: {}", real.display(), e);
            }
            Err(e) => return Err(e.into()),
        }
        self.ledgers.forget_tree(&real);
        Ok(())
    }

    /// Moves the file carrying `id` within `folder` to `new_name` and updates its record.
    ///
    /// The ledger is checked before the physical move; the check and the move are not atomic.
    pub(crate) fn rename_file(
        &self,
        folder: &VirtualPath,
        id: StableId,
        new_name: &str,
    ) -> FilesResult<()> {
        let new_name = validate_name(new_name)?;
        let dir = self.real_path(folder);
        let ledger = self.ledgers.load(&dir)?;
        ledger.assert_can_rename(id, &new_name)?;
        let Some(current) = ledger.find_by_id(id) else {
            return Err(FilesError::NotFound(id.to_string()));
        };
        if current.name == new_name {
            return Ok(());
        }

        let destination = dir.join(new_name.as_str());
        if destination.exists() {
            return Err(FilesError::NameCollision(new_name.into_string()));
        }
        fs::rename(dir.join(current.name.as_str()), &destination)?;
        self.ledgers.update(&dir, |ledger| ledger.rename(id, &new_name))
    }

    /// Moves the subdirectory `old_name` of `folder`; no ledger is touched.
    pub(crate) fn rename_folder(
        &self,
        folder: &VirtualPath,
        old_name: &EntryName,
        new_name: &str,
    ) -> FilesResult<()> {
        let new_name = validate_name(new_name)?;
        if *old_name == new_name {
            return Ok(());
        }
        let dir = self.real_path(folder);
        let source = dir.join(old_name.as_str());
        let destination = dir.join(new_name.as_str());
        if destination.exists() {
            return Err(FilesError::NameCollision(new_name.into_string()));
        }
        fs::rename(&source, &destination)?;
        self.ledgers.forget_tree(&source);
        Ok(())
    }

    /// Sum of the known sizes of all files below `folder`, walking the whole subtree.
    pub(crate) fn total_size(&self, folder: &VirtualPath) -> FilesResult<u64> {
        let mut total = 0u64;
        for name in self.subfolders(folder)? {
            total += self.total_size(&folder.join(name))?;
        }
        for record in self.records(folder)? {
            total += self.size_of(&folder.join(record.name)).unwrap_or(0);
        }
        Ok(total)
    }

    /// Physical size at `path`: zero for directories, `None` when nothing exists there.
    pub(crate) fn size_of(&self, path: &VirtualPath) -> Option<u64> {
        match fs::metadata(self.real_path(path)) {
            Ok(meta) if meta.is_dir() => Some(0),
            Ok(meta) => Some(meta.len()),
            Err(_) => None,
        }
    }

    pub(crate) fn quota_settings(&self) -> FilesResult<QuotaSettings> {
        Ok(self.ledgers.load(&self.root_directory)?.quota_settings())
    }

    /// Applies `change` to the repository root ledger, creating the root directory if needed.
    pub(crate) fn update_quota_settings(
        &self,
        change: impl FnOnce(&mut Ledger),
    ) -> FilesResult<()> {
        fs::create_dir_all(&self.root_directory)?;
        self.ledgers.update(&self.root_directory, |ledger| {
            change(ledger);
            Ok(())
        })
    }

    pub(crate) fn effective_quotas_limit(&self) -> FilesResult<i64> {
        Ok(self
            .quota_settings()?
            .effective_limit(self.defaults.enabled, self.defaults.limit))
    }

    /// Admission check: refuses new content once the repository uses its whole quota.
    fn check_quota(&self) -> FilesResult<()> {
        let limit = self.effective_quotas_limit()?;
        if limit <= 0 {
            return Ok(());
        }
        let used = self.total_size(&VirtualPath::root())?;
        if used >= limit.unsigned_abs() {
            return Err(FilesError::QuotaExceeded { limit, used });
        }
        Ok(())
    }

    /// First `stem-N.ext` not used by a physical entry or a ledger record of `dir`.
    fn free_name(&self, dir: &Path, requested: &EntryName) -> FilesResult<EntryName> {
        let ledger = self.ledgers.load(dir)?;
        let path = Path::new(requested.as_str());
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(requested.as_str());
        let extension = path.extension().and_then(|s| s.to_str());

        let mut n = 0u32;
        loop {
            n += 1;
            let candidate = match extension {
                Some(ext) => format!("{}-{}.{}", stem, n, ext),
                None => format!("{}-{}", stem, n),
            };
            let candidate = validate_name(&candidate)?;
            if !dir.join(candidate.as_str()).exists()
                && ledger.find_by_name(candidate.as_str()).is_none()
            {
                return Ok(candidate);
            }
        }
    }
}

/// Validates a single entry name, rejecting the engine's reserved sidecar names.
pub(crate) fn validate_name(name: &str) -> FilesResult<EntryName> {
    let name = EntryName::new(name).map_err(|e| FilesError::InvalidArgument(e.to_string()))?;
    if name.as_str() == LEDGER_FILE_NAME || name.as_str() == LEDGER_TEMP_FILE_NAME {
        return Err(FilesError::InvalidArgument(format!(
            "'{}' is reserved for repository metadata",
            name
        )));
    }
    Ok(name)
}
