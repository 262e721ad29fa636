//! Manager configuration.
//!
//! Configuration is resolved once at process startup and passed into the [`RepositoryManager`]
//! by value. Nothing in this crate reads process-wide environment variables; callers collect the
//! raw values (see [`crate::constants`]) and hand them to [`ManagerConfig::from_env_values`].
//!
//! [`RepositoryManager`]: crate::RepositoryManager

use crate::constants::DEFAULT_ROOT_DIR;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vfr_files::{LedgerCache, LedgerOptions, QuotaDefaults, RetryPolicy};

/// Configuration of a [`crate::RepositoryManager`].
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    root_directory: PathBuf,
    quotas: QuotaDefaults,
    ledger: LedgerOptions,
}

impl ManagerConfig {
    /// Create a new `ManagerConfig` with the default retry policy and no ledger caching.
    pub fn new(root_directory: PathBuf, quotas_enabled: bool, quotas_limit: i64) -> Self {
        Self {
            root_directory,
            quotas: QuotaDefaults {
                enabled: quotas_enabled,
                limit: quotas_limit,
            },
            ledger: LedgerOptions::default(),
        }
    }

    /// Build a configuration from optional raw values, typically read from the environment.
    ///
    /// Missing or blank values take their defaults. Unparseable flags read as `false`,
    /// unparseable limits as `0` and unknown cache modes as [`LedgerCache::None`], each with a
    /// warning.
    pub fn from_env_values(
        root_directory: Option<String>,
        quotas_enabled: Option<String>,
        quotas_limit: Option<String>,
        ledger_cache: Option<String>,
    ) -> Self {
        let root = non_blank(root_directory).unwrap_or_else(|| DEFAULT_ROOT_DIR.to_string());
        let enabled = non_blank(quotas_enabled).is_some_and(|v| parse_flag(&v));
        let limit = non_blank(quotas_limit).map_or(0, |v| parse_limit(&v));
        let cache = non_blank(ledger_cache).map_or(LedgerCache::None, |v| parse_ledger_cache(&v));

        Self::new(PathBuf::from(root), enabled, limit).with_ledger_cache(cache)
    }

    #[must_use]
    pub fn with_root_directory(mut self, root_directory: PathBuf) -> Self {
        self.root_directory = root_directory;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.ledger.retry = retry;
        self
    }

    #[must_use]
    pub fn with_ledger_cache(mut self, cache: LedgerCache) -> Self {
        self.ledger.cache = cache;
        self
    }

    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    pub fn quota_defaults(&self) -> QuotaDefaults {
        self.quotas
    }

    pub fn ledger_options(&self) -> LedgerOptions {
        self.ledger
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `true`/`false`, case-insensitive.
fn parse_flag(value: &str) -> bool {
    if value.eq_ignore_ascii_case("true") {
        true
    } else if value.eq_ignore_ascii_case("false") {
        false
    } else {
        tracing::warn!("unrecognised quotas flag {:?}, treating as false", value);
        false
    }
}

fn parse_limit(value: &str) -> i64 {
    value.parse().unwrap_or_else(|_| {
        tracing::warn!("unrecognised quota limit {:?}, treating as unlimited", value);
        0
    })
}

/// `none`, `session`, `ttl:<seconds>` or a bare number of seconds.
fn parse_ledger_cache(value: &str) -> LedgerCache {
    let lower = value.to_ascii_lowercase();
    match lower.as_str() {
        "none" | "off" => return LedgerCache::None,
        "session" => return LedgerCache::Session,
        _ => {}
    }
    let seconds = lower.strip_prefix("ttl:").unwrap_or(&lower);
    match seconds.trim().parse::<u64>() {
        Ok(secs) => LedgerCache::Ttl(Duration::from_secs(secs)),
        Err(_) => {
            tracing::warn!("unrecognised ledger cache mode {:?}, caching disabled", value);
            LedgerCache::None
        }
    }
}
