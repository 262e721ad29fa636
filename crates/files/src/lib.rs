//! VFR File Storage
//!
//! This crate provides the filesystem-backed storage engine of the Virtual File Repository.
//!
//! ## Storage Model
//!
//! A repository is a directory tree. File bytes live in ordinary files named after their
//! logical name; every directory additionally carries a sidecar ledger (`.dirinfo.yaml`) that
//! maps each file to a stable identifier and to the name it was originally uploaded under:
//!
//! ```text
//! <root_directory>/
//! └── <repository>/
//!     ├── .dirinfo.yaml      # ledger: files of this directory + quota attributes
//!     ├── readme.txt
//!     └── reports/
//!         ├── .dirinfo.yaml
//!         └── q1.pdf
//! ```
//!
//! Folders are never recorded in a ledger; they exist exactly when the physical directory does.
//!
//! ## Consistency
//!
//! - File bytes are written before the ledger record is appended. A crash in between leaves an
//!   orphan physical file that no listing reports; nothing reconciles it automatically.
//! - Ledgers are rewritten whole on every mutation. Concurrent writers to the same directory
//!   (threads holding separate handles, or other processes) are not coordinated and the last
//!   write wins.
//! - Ledger I/O is retried under a [`RetryPolicy`]; physical file operations never are.
//!
//! ## Example Usage
//!
//! ```no_run
//! use vfr_files::{AddFileMode, FolderOps, LedgerOptions, QuotaDefaults, Repository};
//! use vfr_types::EntryName;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let repository = Repository::open(
//!     EntryName::new("docs")?,
//!     Path::new("attachments"),
//!     QuotaDefaults::default(),
//!     LedgerOptions::default(),
//! );
//!
//! let id = repository.add_file("readme.txt", &b"hello world!"[..], AddFileMode::Throw)?;
//! assert!(repository.get_by_id(id, false)?.is_some());
//! # Ok(())
//! # }
//! ```

mod constants;
mod engine;
mod entry;
mod ledger;
mod repository;

pub use constants::{
    DEFAULT_LEDGER_BACKOFF_MS, DEFAULT_LEDGER_RETRIES, LEDGER_FILE_NAME, LEDGER_TEMP_FILE_NAME,
};
pub use engine::AddFileMode;
pub use entry::{Entry, EntryKind, EntryOps, File, FileOps, Folder, FolderOps, VirtualPath};
pub use ledger::{Ledger, LedgerCache, LedgerOptions, LedgerRecord, QuotaSettings, RetryPolicy};
pub use repository::{QuotaDefaults, Repository};
pub use vfr_uuid::StableId;

use std::path::PathBuf;

/// Errors that can occur during repository operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Empty or separator-containing names, malformed paths, foreign entries
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A file with the requested name already exists (`AddFileMode::Throw`)
    #[error("A file named '{0}' already exists")]
    AlreadyExists(String),

    /// The requested name is taken by another entry of a different kind or identity
    #[error("Name collision: '{0}' is already in use")]
    NameCollision(String),

    /// A ledger record with this logical name is already present
    #[error("Ledger already holds a record named '{0}'")]
    DuplicateName(String),

    /// No ledger record carries the identifier
    #[error("File '{0}' not found")]
    NotFound(String),

    /// A non-final virtual path component is not an existing folder
    #[error("Path '{0}' does not exist")]
    PathNotFound(String),

    /// The repository already uses its effective quota
    #[error("Quota limit reached: {used} of {limit} bytes used")]
    QuotaExceeded { limit: i64, used: u64 },

    /// The operation is not supported by the filesystem backend
    #[error("Operation not implemented: {0}")]
    NotImplemented(&'static str),

    /// Ledger write still failing after the retry budget was spent
    #[error("Failed to write ledger {path} after retries: {source}", path = path.display())]
    TransientIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Ledger read still failing after the retry budget was spent
    #[error("Failed to read ledger {path} after retries: {source}", path = path.display())]
    CorruptLedger {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Ledger could not be rendered as YAML
    #[error("Failed to serialize ledger: {0}")]
    LedgerSerialization(#[from] serde_yaml::Error),

    /// I/O error on a physical file or directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FilesResult<T> = std::result::Result<T, FilesError>;
