//! Repository registry.

use crate::config::ManagerConfig;
use crate::{CoreError, CoreResult};
use std::fs;
use std::path::Path;
use vfr_files::Repository;
use vfr_types::EntryName;

/// Maps repository names to directories below one root directory.
///
/// Repositories are not registered anywhere: a repository exists exactly when its directory
/// does, and [`RepositoryManager::acquire`] hands out a handle whether or not it exists yet.
#[derive(Debug, Clone)]
pub struct RepositoryManager {
    config: ManagerConfig,
}

impl RepositoryManager {
    /// Creates the manager, creating the root directory if it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StorageDirCreation`] if the root directory cannot be created.
    pub fn new(config: ManagerConfig) -> CoreResult<Self> {
        fs::create_dir_all(config.root_directory()).map_err(CoreError::StorageDirCreation)?;
        tracing::debug!(
            "repository root at {}",
            config.root_directory().display()
        );
        Ok(Self { config })
    }

    pub fn root_directory(&self) -> &Path {
        self.config.root_directory()
    }

    /// Process-wide default for whether quotas apply to repositories without custom settings.
    pub fn quotas_enabled(&self) -> bool {
        self.config.quota_defaults().enabled
    }

    /// Process-wide default quota limit in bytes.
    pub fn quotas_limit(&self) -> i64 {
        self.config.quota_defaults().limit
    }

    /// Returns a handle on the repository `name` without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] if `name` is empty or not a single path element.
    pub fn acquire(&self, name: &str) -> CoreResult<Repository> {
        let name = repository_name(name)?;
        Ok(Repository::open(
            name,
            self.config.root_directory(),
            self.config.quota_defaults(),
            self.config.ledger_options(),
        ))
    }

    /// Whether a directory for `name` exists below the root directory.
    pub fn has_repository(&self, name: &str) -> bool {
        match repository_name(name) {
            Ok(name) => self.config.root_directory().join(name.as_str()).is_dir(),
            Err(_) => false,
        }
    }

    /// Names of all repositories, in directory-listing order.
    pub fn list_repositories(&self) -> CoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in
            fs::read_dir(self.config.root_directory()).map_err(CoreError::RepositoryListing)?
        {
            let entry = entry.map_err(CoreError::RepositoryListing)?;
            if !entry.path().is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => tracing::warn!("skipping repository with non-UTF-8 name {:?}", name),
            }
        }
        Ok(names)
    }
}

fn repository_name(name: &str) -> CoreResult<EntryName> {
    EntryName::new(name).map_err(|e| CoreError::InvalidInput(format!("repository name: {}", e)))
}
