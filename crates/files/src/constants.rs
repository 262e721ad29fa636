//! Names reserved by the storage engine inside every repository directory.

/// Sidecar ledger holding identifiers, logical names and quota settings of one directory.
pub const LEDGER_FILE_NAME: &str = ".dirinfo.yaml";

/// Scratch file the ledger is written to before being renamed over [`LEDGER_FILE_NAME`].
pub const LEDGER_TEMP_FILE_NAME: &str = ".dirinfo.yaml.tmp";

/// Default number of additional attempts for a failing ledger read or write.
pub const DEFAULT_LEDGER_RETRIES: usize = 3;

/// Default fixed delay between ledger retry attempts, in milliseconds.
pub const DEFAULT_LEDGER_BACKOFF_MS: u64 = 500;
