//! Constants used throughout the VFR core crate.

/// Default root directory for repositories when no explicit directory is configured.
pub const DEFAULT_ROOT_DIR: &str = "attachments";

/// Environment variable naming the repository root directory.
pub const REPOSITORY_PATH_ENV: &str = "VFR_REPOSITORY_PATH";

/// Environment variable holding the default quotas-enabled flag.
pub const QUOTAS_ENABLED_ENV: &str = "VFR_QUOTAS_ENABLED";

/// Environment variable holding the default quota limit in bytes.
pub const QUOTAS_LIMIT_ENV: &str = "VFR_QUOTAS_LIMIT";

/// Environment variable selecting the ledger cache mode (`none`, `session` or `ttl:<seconds>`).
pub const LEDGER_CACHE_ENV: &str = "VFR_LEDGER_CACHE";
