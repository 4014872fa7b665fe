//! Bulk ingestion configuration
//!
//! Tunables for the bulk block pipeline. Every value has a default and can be
//! overridden through `DBS_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::ids::IdStrategy;
use super::lumis::LumiStrategy;

/// Files per concurrent insertion unit.
pub const DEFAULT_FILE_CHUNK_SIZE: usize = 50;

/// Upper bound on file units running at once.
pub const DEFAULT_MAX_CONCURRENT_UNITS: usize = 8;

/// Lumi lists at or below this size use row-at-a-time inserts.
pub const DEFAULT_LUMI_THRESHOLD: usize = 100;

/// Rows per multi-row lumi insert (four parameters per row).
pub const DEFAULT_LUMI_CHUNK_SIZE: usize = 500;

/// Postgres caps a statement at 65535 bind parameters.
pub const MAX_LUMI_CHUNK_SIZE: usize = 65535 / 4;

/// Attempts at creating a reference entity before giving up on an insert race.
pub const DEFAULT_RESOLVE_ATTEMPTS: u32 = 3;

/// Wall-clock budget for one submission.
pub const DEFAULT_SUBMISSION_TIMEOUT_SECS: u64 = 300;

/// Bulk ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub file_chunk_size: usize,
    pub max_concurrent_units: usize,
    pub lumi_threshold: usize,
    pub lumi_chunk_size: usize,
    pub lumi_strategy: LumiStrategy,
    pub id_strategy: IdStrategy,
    pub resolve_attempts: u32,
    pub submission_timeout_secs: u64,
    /// Schema prefix substituted for `{{owner}}` in statements, e.g. "cms_dbs."
    pub schema_owner: String,
    /// Directory of `<name>.sql` files overriding built-in statements
    pub sql_dir: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            file_chunk_size: DEFAULT_FILE_CHUNK_SIZE,
            max_concurrent_units: DEFAULT_MAX_CONCURRENT_UNITS,
            lumi_threshold: DEFAULT_LUMI_THRESHOLD,
            lumi_chunk_size: DEFAULT_LUMI_CHUNK_SIZE,
            lumi_strategy: LumiStrategy::Staging,
            id_strategy: IdStrategy::Sequence,
            resolve_attempts: DEFAULT_RESOLVE_ATTEMPTS,
            submission_timeout_secs: DEFAULT_SUBMISSION_TIMEOUT_SECS,
            schema_owner: String::new(),
            sql_dir: None,
        }
    }
}

impl IngestConfig {
    /// Load ingestion configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let config = Self {
            file_chunk_size: env_parse("DBS_FILE_CHUNK_SIZE", defaults.file_chunk_size),
            max_concurrent_units: env_parse(
                "DBS_MAX_CONCURRENT_UNITS",
                defaults.max_concurrent_units,
            ),
            lumi_threshold: env_parse("DBS_LUMI_THRESHOLD", defaults.lumi_threshold),
            lumi_chunk_size: env_parse("DBS_LUMI_CHUNK_SIZE", defaults.lumi_chunk_size),
            lumi_strategy: match std::env::var("DBS_LUMI_STRATEGY") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.lumi_strategy,
            },
            id_strategy: match std::env::var("DBS_ID_STRATEGY") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.id_strategy,
            },
            resolve_attempts: env_parse("DBS_RESOLVE_ATTEMPTS", defaults.resolve_attempts),
            submission_timeout_secs: env_parse(
                "DBS_SUBMISSION_TIMEOUT_SECS",
                defaults.submission_timeout_secs,
            ),
            schema_owner: std::env::var("DBS_SCHEMA_OWNER").unwrap_or(defaults.schema_owner),
            sql_dir: std::env::var("DBS_SQL_DIR").ok().map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.file_chunk_size == 0 {
            anyhow::bail!("DBS_FILE_CHUNK_SIZE must be greater than 0");
        }
        if self.max_concurrent_units == 0 {
            anyhow::bail!("DBS_MAX_CONCURRENT_UNITS must be greater than 0");
        }
        if self.lumi_chunk_size == 0 || self.lumi_chunk_size > MAX_LUMI_CHUNK_SIZE {
            anyhow::bail!(
                "DBS_LUMI_CHUNK_SIZE must be between 1 and {} (got {})",
                MAX_LUMI_CHUNK_SIZE,
                self.lumi_chunk_size
            );
        }
        if self.resolve_attempts == 0 {
            anyhow::bail!("DBS_RESOLVE_ATTEMPTS must be greater than 0");
        }
        if !self.schema_owner.is_empty() && !self.schema_owner.ends_with('.') {
            anyhow::bail!(
                "DBS_SCHEMA_OWNER must end with '.' (got '{}')",
                self.schema_owner
            );
        }
        Ok(())
    }

    pub fn submission_timeout(&self) -> Duration {
        Duration::from_secs(self.submission_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
