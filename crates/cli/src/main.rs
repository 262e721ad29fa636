use clap::{Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vfr_core::constants::{
    LEDGER_CACHE_ENV, QUOTAS_ENABLED_ENV, QUOTAS_LIMIT_ENV, REPOSITORY_PATH_ENV,
};
use vfr_core::{ManagerConfig, RepositoryManager};
use vfr_files::{AddFileMode, Entry, EntryKind, EntryOps, FileOps, FolderOps, Repository, StableId};

#[derive(Parser)]
#[command(name = "vfr")]
#[command(about = "Virtual file repository CLI")]
struct Cli {
    /// Root directory holding all repositories (overrides VFR_REPOSITORY_PATH)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all repositories
    ListRepos,
    /// Check whether a repository exists
    Has {
        repository: String,
    },
    /// List the folders and files of a folder
    Ls {
        repository: String,
        /// Folder path inside the repository
        path: Option<String>,
    },
    /// Add a local file
    Add {
        repository: String,
        /// Local file to upload
        source: PathBuf,
        /// Destination folder inside the repository
        #[arg(long)]
        dir: Option<String>,
        /// Name to store the file under (defaults to the source file name)
        #[arg(long)]
        name: Option<String>,
        /// What to do when the name is already taken
        #[arg(long, value_enum, default_value_t = Mode::Throw)]
        mode: Mode,
    },
    /// Write a file's bytes to stdout
    Cat {
        repository: String,
        /// File path, or a file identifier searched recursively
        target: String,
    },
    /// Delete a file or folder
    Rm {
        repository: String,
        path: String,
        #[arg(long)]
        ignore_errors: bool,
    },
    /// Rename a file or folder in place
    Mv {
        repository: String,
        path: String,
        new_name: String,
    },
    /// Create a folder, including missing parents
    Mkdir {
        repository: String,
        path: String,
    },
    /// Show the total size of a folder
    Du {
        repository: String,
        path: Option<String>,
    },
    /// Show or change the quota settings of a repository
    Quota {
        repository: String,
        #[arg(long)]
        custom: Option<bool>,
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Copy a file from another repository into the root of this one
    Import {
        repository: String,
        from_repository: String,
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Throw,
    Overwrite,
    ChangeName,
}

impl From<Mode> for AddFileMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Throw => AddFileMode::Throw,
            Mode::Overwrite => AddFileMode::Overwrite,
            Mode::ChangeName => AddFileMode::ChangeName,
        }
    }
}

/// Runs `$body` with `$folder` bound to whichever folder-like entry `$entry` holds.
macro_rules! with_folder {
    ($entry:expr, $folder:ident => $body:expr) => {
        match $entry {
            Entry::Repository($folder) => $body,
            Entry::Folder($folder) => $body,
            Entry::File(file) => {
                return Err(format!("'{}' is a file, not a folder", file.full_path()).into())
            }
        }
    };
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("vfr=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ManagerConfig::from_env_values(
        std::env::var(REPOSITORY_PATH_ENV).ok(),
        std::env::var(QUOTAS_ENABLED_ENV).ok(),
        std::env::var(QUOTAS_LIMIT_ENV).ok(),
        std::env::var(LEDGER_CACHE_ENV).ok(),
    );
    if let Some(root) = cli.root {
        config = config.with_root_directory(root);
    }
    let manager = RepositoryManager::new(config)?;

    match cli.command {
        Some(Commands::ListRepos) => {
            let names = manager.list_repositories()?;
            if names.is_empty() {
                println!("No repositories found.");
            }
            for name in names {
                println!("{}", name);
            }
        }
        Some(Commands::Has { repository }) => {
            println!("{}", manager.has_repository(&repository));
        }
        Some(Commands::Ls { repository, path }) => {
            let repo = manager.acquire(&repository)?;
            let entry = folder_entry(&repo, path.as_deref())?;
            with_folder!(entry, folder => {
                for sub in folder.get_folders()? {
                    println!("{:<36}  {:>10}  {}/", "", "-", sub.name());
                }
                for file in folder.get_files()? {
                    let size = file
                        .size()
                        .map_or_else(|| "?".to_string(), |s| s.to_string());
                    println!("{}  {:>10}  {}", file.stable_id(), size, file.name());
                }
            });
        }
        Some(Commands::Add {
            repository,
            source,
            dir,
            name,
            mode,
        }) => {
            let repo = manager.acquire(&repository)?;
            let name = match name {
                Some(name) => name,
                None => source
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .ok_or_else(|| format!("cannot derive a name from {}", source.display()))?,
            };
            let reader = std::fs::File::open(&source)?;
            let entry = folder_entry(&repo, dir.as_deref())?;
            let id = with_folder!(entry, folder => folder.add_file(&name, reader, mode.into())?);
            println!("{}", id);
        }
        Some(Commands::Cat { repository, target }) => {
            let repo = manager.acquire(&repository)?;
            let file = match StableId::parse(&target) {
                Ok(id) => repo.get_by_id(id, true)?,
                Err(_) => repo.get_by_path(&target)?.and_then(Entry::into_file),
            }
            .ok_or_else(|| format!("no file '{}' in repository '{}'", target, repository))?;
            let mut reader = file.open()?;
            io::copy(&mut reader, &mut io::stdout().lock())?;
        }
        Some(Commands::Rm {
            repository,
            path,
            ignore_errors,
        }) => {
            let repo = manager.acquire(&repository)?;
            let deleted = remove_entry(&repo, &path, ignore_errors)?;
            println!("Deleted {}", deleted);
        }
        Some(Commands::Mv {
            repository,
            path,
            new_name,
        }) => {
            let repo = manager.acquire(&repository)?;
            let entry = existing_entry(&repo, &path)?;
            entry.rename(&new_name)?;
            println!("Renamed {} to {}", entry.full_path(), new_name);
        }
        Some(Commands::Mkdir { repository, path }) => {
            let repo = manager.acquire(&repository)?;
            let mut segments = path.split('/').filter(|s| !s.is_empty());
            let first = segments.next().ok_or("folder path is empty")?;
            let mut folder = repo.mkdir(first)?;
            for segment in segments {
                folder = folder.mkdir(segment)?;
            }
            println!("Created {}", folder.full_path());
        }
        Some(Commands::Du { repository, path }) => {
            let repo = manager.acquire(&repository)?;
            let entry = folder_entry(&repo, path.as_deref())?;
            let total = with_folder!(entry, folder => folder.total_size()?);
            println!("{}", total);
        }
        Some(Commands::Quota {
            repository,
            custom,
            enabled,
            limit,
        }) => {
            let repo = manager.acquire(&repository)?;
            if let Some(custom) = custom {
                repo.set_quotas_custom_settings(custom)?;
            }
            if let Some(enabled) = enabled {
                repo.set_quotas_enabled(enabled)?;
            }
            if let Some(limit) = limit {
                repo.set_quotas_limit(limit)?;
            }
            println!("custom settings: {}", repo.quotas_custom_settings()?);
            println!("enabled:         {}", repo.quotas_enabled()?);
            println!("limit:           {}", repo.quotas_limit()?);
            println!("effective limit: {}", repo.effective_quotas_limit()?);
            println!("used:            {}", repo.total_size()?);
        }
        Some(Commands::Import {
            repository,
            from_repository,
            id,
        }) => {
            let target = manager.acquire(&repository)?;
            let source = manager.acquire(&from_repository)?;
            let id = StableId::parse(&id)?;
            let file = source
                .get_by_id(id, true)?
                .ok_or_else(|| format!("no file {} in repository '{}'", id, from_repository))?;
            let imported = target.import(&file)?;
            println!("{}", imported);
        }
        None => {
            println!("No command given. Use --help for usage.");
        }
    }

    Ok(())
}

/// Resolves `path` to a folder or the repository root.
fn folder_entry(repo: &Repository, path: Option<&str>) -> Result<Entry, Box<dyn Error>> {
    match path {
        None => Ok(Entry::Repository(repo.clone())),
        Some(path) => existing_entry(repo, path),
    }
}

fn existing_entry(repo: &Repository, path: &str) -> Result<Entry, Box<dyn Error>> {
    repo.get_by_path(path)?
        .ok_or_else(|| format!("'{}' not found in repository '{}'", path, repo.name()).into())
}

/// Deletes the file or folder at `path` and returns its full path.
///
/// The repository root is refused; removing a whole repository is not a path operation.
fn remove_entry(
    repo: &Repository,
    path: &str,
    ignore_errors: bool,
) -> Result<String, Box<dyn Error>> {
    let entry = existing_entry(repo, path)?;
    if entry.kind() == EntryKind::Repository {
        return Err(format!(
            "refusing to delete the root of repository '{}'",
            repo.name()
        )
        .into());
    }
    entry.delete(ignore_errors)?;
    Ok(entry.full_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vfr_files::{LedgerOptions, QuotaDefaults};
    use vfr_types::EntryName;

    fn open(root: &std::path::Path) -> Repository {
        Repository::open(
            EntryName::new("docs").unwrap(),
            root,
            QuotaDefaults::default(),
            LedgerOptions::default(),
        )
    }

    #[test]
    fn test_remove_entry_refuses_repository_root() {
        let temp = TempDir::new().unwrap();
        let repo = open(temp.path());
        repo.add_file("keep.txt", &b"x"[..], AddFileMode::Throw)
            .unwrap();

        for path in ["", "/"] {
            assert!(remove_entry(&repo, path, false).is_err());
            assert!(remove_entry(&repo, path, true).is_err());
        }

        assert!(temp.path().join("docs/keep.txt").is_file());
        assert_eq!(repo.get_files().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_entry_deletes_file() {
        let temp = TempDir::new().unwrap();
        let repo = open(temp.path());
        repo.mkdir("sub")
            .unwrap()
            .add_file("a.txt", &b"x"[..], AddFileMode::Throw)
            .unwrap();

        let deleted = remove_entry(&repo, "sub/a.txt", false).unwrap();

        assert_eq!(deleted, "docs/sub/a.txt");
        assert!(!temp.path().join("docs/sub/a.txt").exists());
        assert!(remove_entry(&repo, "sub/a.txt", false).is_err());
    }
}
