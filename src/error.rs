//! Error types for snowdrift using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed"))]
    ObjectStore { source: object_store::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error"))]
    S3Config { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error"))]
    Io { source: std::io::Error },
}

impl StorageError {
    /// Check if this error represents a "not found" condition (404, NoSuchKey, etc.)
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Storage URL is empty.
    #[snafu(display("Storage URL cannot be empty"))]
    EmptyStorageUrl,

    /// Warehouse account is empty.
    #[snafu(display("Warehouse account cannot be empty"))]
    EmptyAccount,

    /// Warehouse database is empty.
    #[snafu(display("Warehouse database cannot be empty"))]
    EmptyDatabase,

    /// Warehouse schema is empty.
    #[snafu(display("Warehouse schema cannot be empty"))]
    EmptySchema,

    /// Stage name is empty.
    #[snafu(display("Stage name cannot be empty"))]
    EmptyStage,

    /// Pause-poll backoff factor must be at least 1.
    #[snafu(display("Pause-poll backoff factor must be >= 1.0, got {factor}"))]
    InvalidBackoffFactor { factor: f64 },

    /// Pause-poll attempt budget must be non-zero.
    #[snafu(display("Pause-poll max attempts must be > 0"))]
    ZeroPollAttempts,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },
}

// ============ Schema Errors ============

/// Errors that can occur during schema inference.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SchemaError {
    /// A table directory has no objects to sample.
    #[snafu(display("No sample file available for table directory '{table}'"))]
    EmptySample { table: String },

    /// Failed to read the sample file from storage.
    #[snafu(display("Failed to read sample file '{key}'"))]
    SampleRead { key: String, source: StorageError },

    /// Failed to parse the parquet footer.
    #[snafu(display("Failed to parse parquet footer of '{key}'"))]
    ParquetFooter {
        key: String,
        source: parquet::errors::ParquetError,
    },

    /// Failed to convert the parquet schema to an Arrow schema.
    #[snafu(display("Failed to convert parquet schema of '{key}'"))]
    ArrowConversion {
        key: String,
        source: parquet::errors::ParquetError,
    },
}

// ============ Catalog Errors ============

/// Errors raised by the warehouse SQL interface.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CatalogError {
    /// A DDL/DML/query statement failed.
    #[snafu(display("Problem with statement: {statement} -> {message}"))]
    Statement { statement: String, message: String },

    /// Failed to establish the warehouse connection.
    #[snafu(display("Failed to connect to warehouse: {message}"))]
    Connection { message: String },

    /// Failed to decode a warehouse response body.
    #[snafu(display("Failed to decode warehouse response"))]
    ResponseDecode { source: serde_json::Error },
}

// ============ Pipe Errors ============

/// Errors raised by the pipe lifecycle controller.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipeError {
    /// The pause/drain poll exhausted its attempt budget.
    #[snafu(display(
        "Pipe '{pipe}' did not reach the paused+drained state after {attempts} polls"
    ))]
    DrainTimeout { pipe: String, attempts: u32 },

    /// A pipe command or status query failed.
    #[snafu(display("Pipe command failed"))]
    Command { source: CatalogError },

    /// The pipe status query returned no rows.
    #[snafu(display("Pipe status query for '{pipe}' returned no rows"))]
    StatusEmpty { pipe: String },

    /// The pipe status payload could not be parsed.
    #[snafu(display("Failed to parse pipe status for '{pipe}'"))]
    StatusParse {
        pipe: String,
        source: serde_json::Error,
    },
}

impl From<CatalogError> for PipeError {
    fn from(source: CatalogError) -> Self {
        PipeError::Command { source }
    }
}

// ============ Sync Error (per-table) ============

/// Errors crossing the orchestrator's per-table failure boundary.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SyncError {
    /// Schema inference failed.
    #[snafu(display("Schema inference failed"))]
    Schema { source: SchemaError },

    /// Catalog operation failed.
    #[snafu(display("Catalog operation failed"))]
    Catalog { source: CatalogError },

    /// Pipe lifecycle transition failed.
    #[snafu(display("Pipe lifecycle transition failed"))]
    Pipe { source: PipeError },

    /// Storage operation failed.
    #[snafu(display("Storage error"))]
    SyncStorage { source: StorageError },
}

impl From<SchemaError> for SyncError {
    fn from(source: SchemaError) -> Self {
        SyncError::Schema { source }
    }
}

impl From<CatalogError> for SyncError {
    fn from(source: CatalogError) -> Self {
        SyncError::Catalog { source }
    }
}

impl From<PipeError> for SyncError {
    fn from(source: PipeError) -> Self {
        SyncError::Pipe { source }
    }
}

impl From<StorageError> for SyncError {
    fn from(source: StorageError) -> Self {
        SyncError::SyncStorage { source }
    }
}
