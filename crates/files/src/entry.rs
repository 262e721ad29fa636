//! Entry model: files, folders and repositories as transient views.
//!
//! An entry is never persisted. It is built on every navigation call from the current state of
//! the physical tree and the ledgers, and holds only its [`VirtualPath`] (the ownership chain,
//! resolved top-down from the repository) plus a cheap handle to its [`Repository`].
//!
//! Capabilities are split by kind: [`EntryOps`] for everything addressable, [`FolderOps`] for
//! folders and repositories, [`FileOps`] for files. [`Entry`] is the tagged union returned by
//! path lookups.

use crate::engine::{AddFileMode, Resolved};
use crate::ledger::LedgerRecord;
use crate::repository::Repository;
use crate::{FilesError, FilesResult};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use vfr_types::EntryName;
use vfr_uuid::StableId;

/// Slash-delimited location of an entry inside its repository.
///
/// Displays as `/a/b/c`; the repository root displays as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VirtualPath {
    segments: Vec<EntryName>,
}

impl VirtualPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[EntryName] {
        &self.segments
    }

    /// Last segment, `None` for the root.
    pub fn name(&self) -> Option<&EntryName> {
        self.segments.last()
    }

    /// Path of the enclosing folder, `None` for the root.
    pub fn parent(&self) -> Option<VirtualPath> {
        let (_, parent) = self.segments.split_last()?;
        Some(Self {
            segments: parent.to_vec(),
        })
    }

    #[must_use]
    pub fn join(&self, name: EntryName) -> VirtualPath {
        let mut segments = self.segments.clone();
        segments.push(name);
        Self { segments }
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

/// Discriminant of an [`Entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
    Repository,
}

/// Operations shared by every addressable entry.
pub trait EntryOps {
    fn kind(&self) -> EntryKind;

    fn repository(&self) -> &Repository;

    fn virtual_path(&self) -> &VirtualPath;

    /// Stable identifier; only files carry one.
    fn id(&self) -> Option<StableId>;

    /// Logical name.
    fn name(&self) -> &str;

    /// Name the entry was created under. Folders report their logical name.
    fn original_name(&self) -> &str {
        self.name()
    }

    /// Repository name followed by the virtual path.
    fn full_path(&self) -> String {
        format!("{}{}", self.repository().name(), self.virtual_path())
    }

    /// Physical location on the host filesystem.
    fn real_path(&self) -> PathBuf {
        self.repository().engine().real_path(self.virtual_path())
    }

    /// Whether a physical directory exists at [`Self::real_path`].
    fn is_folder(&self) -> bool {
        self.real_path().is_dir()
    }

    /// Byte length; `Some(0)` for folders and `None` when nothing exists physically.
    fn size(&self) -> Option<u64> {
        self.repository().engine().size_of(self.virtual_path())
    }

    fn delete(&self, ignore_errors: bool) -> FilesResult<()>;

    fn rename(&self, new_name: &str) -> FilesResult<()>;
}

/// Operations on folders, including the repository root.
pub trait FolderOps: EntryOps {
    /// One file per ledger record, in ledger order.
    fn get_files(&self) -> FilesResult<Vec<File>> {
        let folder = self.virtual_path();
        Ok(self
            .repository()
            .engine()
            .records(folder)?
            .into_iter()
            .map(|record| File::from_record(self.repository(), folder, record))
            .collect())
    }

    /// One folder per physical subdirectory, in directory-listing order.
    fn get_folders(&self) -> FilesResult<Vec<Folder>> {
        let folder = self.virtual_path();
        Ok(self
            .repository()
            .engine()
            .subfolders(folder)?
            .into_iter()
            .map(|name| Folder::new(self.repository(), folder, name))
            .collect())
    }

    /// Stores the bytes of `reader` under `name` and returns the file's identifier.
    ///
    /// # Errors
    ///
    /// - [`FilesError::InvalidArgument`] for an empty, separator-containing or reserved name
    /// - [`FilesError::QuotaExceeded`] when the repository already uses its effective quota
    /// - [`FilesError::NameCollision`] when a folder of that name exists
    /// - [`FilesError::AlreadyExists`] when a file of that name exists and `mode` is `Throw`
    fn add_file<R: Read>(&self, name: &str, reader: R, mode: AddFileMode) -> FilesResult<StableId> {
        let (id, stored_as) =
            self.repository()
                .engine()
                .add_file(self.virtual_path(), name, reader, mode)?;
        tracing::debug!(
            "added {}{}/{} as {}",
            self.repository().name(),
            self.virtual_path(),
            stored_as,
            id
        );
        Ok(id)
    }

    /// Creates a subfolder, succeeding if it already exists.
    fn mkdir(&self, name: &str) -> FilesResult<Folder> {
        let folder = self.virtual_path();
        let name = self.repository().engine().make_dir(folder, name)?;
        Ok(Folder::new(self.repository(), folder, name))
    }

    /// Finds a file by identifier in this folder, or depth-first below it when `recursive`.
    fn get_by_id(&self, id: StableId, recursive: bool) -> FilesResult<Option<File>> {
        let engine = self.repository().engine();
        let folder = self.virtual_path();
        let found = if recursive {
            engine.find_by_id_recursive(folder, id)?
        } else {
            engine
                .find_by_id(folder, id)?
                .map(|record| (folder.clone(), record))
        };
        Ok(found.map(|(folder, record)| File::from_record(self.repository(), &folder, record)))
    }

    /// Resolves a slash-delimited path relative to this folder.
    ///
    /// An empty path yields this folder, a leading `/` resolves from the repository root.
    ///
    /// # Errors
    ///
    /// - [`FilesError::InvalidArgument`] if the path has empty or invalid elements
    /// - [`FilesError::PathNotFound`] if a non-final element is not an existing folder
    fn get_by_path(&self, path: &str) -> FilesResult<Option<Entry>> {
        let repository = self.repository();
        let resolved = repository.engine().resolve(self.virtual_path(), path)?;
        Ok(resolved.map(|resolved| match resolved {
            Resolved::Folder(path) => match Folder::at(repository, path) {
                Some(folder) => Entry::Folder(folder),
                None => Entry::Repository(repository.clone()),
            },
            Resolved::File { folder, record } => {
                Entry::File(File::from_record(repository, &folder, record))
            }
        }))
    }

    /// Deletes a direct child of this folder.
    ///
    /// Physical removal failures are swallowed when `ignore_errors` is set; a file's ledger
    /// record is removed either way.
    fn delete_entry(&self, entry: &Entry, ignore_errors: bool) -> FilesResult<()> {
        if entry.kind() == EntryKind::Repository {
            return Err(FilesError::InvalidArgument(
                "a repository is not the child of a folder".into(),
            ));
        }
        self.assert_child(entry)?;
        entry.delete(ignore_errors)
    }

    /// Renames a direct child of this folder.
    fn rename_entry(&self, entry: &Entry, new_name: &str) -> FilesResult<()> {
        if entry.kind() == EntryKind::Repository {
            return Err(FilesError::NotImplemented("renaming a repository"));
        }
        self.assert_child(entry)?;
        entry.rename(new_name)
    }

    /// Recursive sum of all known file sizes below this folder.
    fn total_size(&self) -> FilesResult<u64> {
        self.repository().engine().total_size(self.virtual_path())
    }

    /// Fails unless `entry` lives directly inside this folder of the same repository.
    fn assert_child(&self, entry: &Entry) -> FilesResult<()> {
        if entry.repository().same_as(self.repository())
            && entry.virtual_path().parent().as_ref() == Some(self.virtual_path())
        {
            return Ok(());
        }
        Err(FilesError::InvalidArgument(format!(
            "'{}' is not a direct child of '{}{}'",
            entry.full_path(),
            self.repository().name(),
            self.virtual_path()
        )))
    }
}

/// Operations on files.
pub trait FileOps: EntryOps {
    /// Opens the file bytes for reading. The handle is released when dropped.
    fn open(&self) -> FilesResult<fs::File> {
        Ok(fs::File::open(self.real_path())?)
    }
}

/// A file recorded in a folder's ledger.
#[derive(Debug, Clone)]
pub struct File {
    repository: Repository,
    path: VirtualPath,
    name: EntryName,
    id: StableId,
    original_name: String,
}

impl File {
    fn from_record(repository: &Repository, folder: &VirtualPath, record: LedgerRecord) -> Self {
        Self {
            repository: repository.clone(),
            path: folder.join(record.name.clone()),
            name: record.name,
            id: record.id,
            original_name: record.original_name,
        }
    }

    /// The identifier, which every file has.
    pub fn stable_id(&self) -> StableId {
        self.id
    }

    fn folder_path(&self) -> VirtualPath {
        self.path.parent().unwrap_or_default()
    }
}

impl EntryOps for File {
    fn kind(&self) -> EntryKind {
        EntryKind::File
    }

    fn repository(&self) -> &Repository {
        &self.repository
    }

    fn virtual_path(&self) -> &VirtualPath {
        &self.path
    }

    fn id(&self) -> Option<StableId> {
        Some(self.id)
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn original_name(&self) -> &str {
        &self.original_name
    }

    fn delete(&self, ignore_errors: bool) -> FilesResult<()> {
        self.repository.engine().delete_file(
            &self.folder_path(),
            &self.name,
            self.id,
            ignore_errors,
        )
    }

    fn rename(&self, new_name: &str) -> FilesResult<()> {
        self.repository
            .engine()
            .rename_file(&self.folder_path(), self.id, new_name)
    }
}

impl FileOps for File {}

/// A physical subdirectory of a repository.
#[derive(Debug, Clone)]
pub struct Folder {
    repository: Repository,
    path: VirtualPath,
    name: EntryName,
}

impl Folder {
    pub(crate) fn new(repository: &Repository, parent: &VirtualPath, name: EntryName) -> Self {
        Self {
            repository: repository.clone(),
            path: parent.join(name.clone()),
            name,
        }
    }

    /// The folder at `path`, `None` for the repository root.
    pub(crate) fn at(repository: &Repository, path: VirtualPath) -> Option<Self> {
        let name = path.name()?.clone();
        Some(Self {
            repository: repository.clone(),
            path,
            name,
        })
    }
}

impl EntryOps for Folder {
    fn kind(&self) -> EntryKind {
        EntryKind::Folder
    }

    fn repository(&self) -> &Repository {
        &self.repository
    }

    fn virtual_path(&self) -> &VirtualPath {
        &self.path
    }

    fn id(&self) -> Option<StableId> {
        None
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn delete(&self, ignore_errors: bool) -> FilesResult<()> {
        self.repository
            .engine()
            .delete_folder(&self.path, ignore_errors)
    }

    fn rename(&self, new_name: &str) -> FilesResult<()> {
        let parent = self.path.parent().unwrap_or_default();
        self.repository
            .engine()
            .rename_folder(&parent, &self.name, new_name)
    }
}

impl FolderOps for Folder {}

/// Any addressable node, as returned by [`FolderOps::get_by_path`].
#[derive(Debug, Clone)]
pub enum Entry {
    File(File),
    Folder(Folder),
    Repository(Repository),
}

impl Entry {
    pub fn as_file(&self) -> Option<&File> {
        match self {
            Entry::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn into_file(self) -> Option<File> {
        match self {
            Entry::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn into_folder(self) -> Option<Folder> {
        match self {
            Entry::Folder(folder) => Some(folder),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn EntryOps {
        match self {
            Entry::File(file) => file,
            Entry::Folder(folder) => folder,
            Entry::Repository(repository) => repository,
        }
    }
}

impl From<File> for Entry {
    fn from(file: File) -> Self {
        Entry::File(file)
    }
}

impl From<Folder> for Entry {
    fn from(folder: Folder) -> Self {
        Entry::Folder(folder)
    }
}

impl EntryOps for Entry {
    fn kind(&self) -> EntryKind {
        self.inner().kind()
    }

    fn repository(&self) -> &Repository {
        self.inner().repository()
    }

    fn virtual_path(&self) -> &VirtualPath {
        self.inner().virtual_path()
    }

    fn id(&self) -> Option<StableId> {
        self.inner().id()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn original_name(&self) -> &str {
        self.inner().original_name()
    }

    fn delete(&self, ignore_errors: bool) -> FilesResult<()> {
        self.inner().delete(ignore_errors)
    }

    fn rename(&self, new_name: &str) -> FilesResult<()> {
        self.inner().rename(new_name)
    }
}
