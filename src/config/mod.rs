//! Configuration for the snowdrift synchronizer.
//!
//! Everything the synchronizer needs is resolved into one [`Config`] struct
//! at startup and passed by reference from there; no component reads the
//! environment at use sites.

mod vars;

pub use vars::{InterpolationResult, interpolate};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ConfigError;

fn default_stage_name() -> String {
    "ingest_stage".to_string()
}

fn default_retention_days() -> i64 {
    7
}

fn default_initial_delay_secs() -> f64 {
    2.0
}

fn default_backoff_factor() -> f64 {
    1.3
}

fn default_max_attempts() -> u32 {
    30
}

/// Warehouse connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Account identifier, e.g. `myorg-myaccount`.
    pub account: String,
    /// Bearer token for the SQL API.
    pub token: String,
    /// Target database.
    pub database: String,
    /// Target schema.
    pub schema: String,
    /// Virtual warehouse to run statements on.
    #[serde(default)]
    pub warehouse: Option<String>,
    /// Role to assume.
    #[serde(default)]
    pub role: Option<String>,
}

/// Source storage location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// URL of the landing prefix, e.g. `s3://bucket/landing/`.
    pub url: String,
    /// Backend-specific options passed through to the object store.
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

/// Credentials embedded into the external stage definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageCredentials {
    pub access_key: String,
    pub secret_key: String,
}

/// Tuning for the pipe pause/drain poll loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PausePollConfig {
    /// Delay before the second status poll, in seconds.
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: f64,
    /// Multiplicative factor applied after each unsatisfied poll.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Attempt budget; exhaustion surfaces a drain-timeout error.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for PausePollConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_initial_delay_secs(),
            backoff_factor: default_backoff_factor(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Synchronizer behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Name of the external stage pointing at the landing prefix.
    #[serde(default = "default_stage_name")]
    pub stage: String,
    /// Credentials baked into the stage definition, if the warehouse cannot
    /// reach the bucket through an integration.
    #[serde(default)]
    pub stage_credentials: Option<StageCredentials>,
    /// Table directories to skip (matched case-insensitively).
    #[serde(default)]
    pub excluded_tables: Vec<String>,
    /// Only objects older than this many days are backfilled at table
    /// creation; newer ones are left to the pipe.
    #[serde(default = "default_retention_days")]
    pub backfill_retention_days: i64,
    /// Pause/drain poll tuning.
    #[serde(default)]
    pub pause_poll: PausePollConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            stage: default_stage_name(),
            stage_credentials: None,
            excluded_tables: Vec::new(),
            backfill_retention_days: default_retention_days(),
            pause_poll: PausePollConfig::default(),
        }
    }
}

/// Main configuration for snowdrift.
///
/// # Example
///
/// ```yaml
/// warehouse:
///   account: myorg-myaccount
///   token: ${WAREHOUSE_TOKEN}
///   database: ANALYTICS
///   schema: LANDING
///   warehouse: INGEST_WH
///
/// storage:
///   url: "s3://data-transfer/landing/"
///
/// sync:
///   stage: landing_stage
///   excluded_tables:
///     - images
///     - files
///   backfill_retention_days: 7
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Warehouse connection parameters.
    pub warehouse: WarehouseConfig,
    /// Source storage location.
    pub storage: StorageConfig,
    /// Synchronizer behavior.
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile { source })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        // Interpolate environment variables
        let result = interpolate(contents);
        if !result.is_ok() {
            return Err(ConfigError::EnvInterpolation {
                message: result.errors.join("\n"),
            });
        }

        let config: Config = serde_yaml::from_str(&result.text)
            .map_err(|source| ConfigError::YamlParse { source })?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.url.is_empty() {
            return Err(ConfigError::EmptyStorageUrl);
        }
        if self.warehouse.account.is_empty() {
            return Err(ConfigError::EmptyAccount);
        }
        if self.warehouse.database.is_empty() {
            return Err(ConfigError::EmptyDatabase);
        }
        if self.warehouse.schema.is_empty() {
            return Err(ConfigError::EmptySchema);
        }
        if self.sync.stage.is_empty() {
            return Err(ConfigError::EmptyStage);
        }
        if self.sync.pause_poll.backoff_factor < 1.0 {
            return Err(ConfigError::InvalidBackoffFactor {
                factor: self.sync.pause_poll.backoff_factor,
            });
        }
        if self.sync.pause_poll.max_attempts == 0 {
            return Err(ConfigError::ZeroPollAttempts);
        }
        Ok(())
    }

    /// Check whether a table directory is on the exclusion list.
    pub fn is_excluded(&self, table: &str) -> bool {
        self.sync
            .excluded_tables
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table))
    }
}
