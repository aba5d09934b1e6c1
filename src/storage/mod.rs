//! Object storage abstraction for the landing location.
//!
//! The synchronizer only ever reads from storage: it lists the table
//! directories under the landing prefix, lists the data objects inside one
//! directory, and fetches sample file bytes for schema inference. That
//! contract is captured by [`ObjectStorage`] so tests can substitute an
//! in-memory implementation; [`StorageProvider`] is the production
//! implementation over `object_store` (S3 and local filesystem).

mod local;
mod s3;

pub use local::LocalConfig;
pub use s3::S3Config;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use object_store::ObjectStore;
use object_store::path::Path;
use regex::Regex;
use snafu::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::{InvalidUrlSnafu, ObjectStoreSnafu, StorageError};

/// A reference-counted storage handle.
pub type ObjectStorageRef = Arc<dyn ObjectStorage>;

/// A data object in the landing location.
///
/// Read-only reflection of the storage system's current state; recomputed
/// on every run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataObject {
    /// Key relative to the landing prefix, e.g. `orders/part-0001.parquet`.
    pub key: String,
    /// Last-modified timestamp reported by the storage system.
    pub last_modified: DateTime<Utc>,
}

impl DataObject {
    /// The file name portion of the key.
    pub fn basename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Read-only view of the landing location.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// List the table directories directly under the landing prefix.
    async fn list_table_directories(&self) -> Result<Vec<String>, StorageError>;

    /// List all objects under one table directory, in the storage system's
    /// native listing order.
    async fn list_objects(&self, table: &str) -> Result<Vec<DataObject>, StorageError>;

    /// Fetch the contents of an object by its key relative to the prefix.
    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;
}

// URL patterns for supported storage backends
const S3_URL: &str = r"^[sS]3[aA]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+?))?/?$";
const FILE_URI: &str = r"^file://(?P<path>.*)$";
const FILE_PATH: &str = r"^/(?P<path>.*)$";

fn matchers() -> &'static Vec<(Backend, Regex)> {
    static MATCHERS: OnceLock<Vec<(Backend, Regex)>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        vec![
            (Backend::S3, Regex::new(S3_URL).unwrap()),
            (Backend::Local, Regex::new(FILE_URI).unwrap()),
            (Backend::Local, Regex::new(FILE_PATH).unwrap()),
        ]
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    S3,
    Local,
}

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    S3(S3Config),
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a URL into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        for (backend, regex) in matchers() {
            if let Some(matches) = regex.captures(url) {
                return match backend {
                    Backend::S3 => Self::parse_s3(matches),
                    Backend::Local => Self::parse_local(matches),
                };
            }
        }

        InvalidUrlSnafu {
            url: url.to_string(),
        }
        .fail()
    }

    fn parse_s3(matches: regex::Captures) -> Result<Self, StorageError> {
        let bucket = matches
            .name("bucket")
            .expect("bucket should always be available")
            .as_str()
            .to_string();

        let key = matches.name("key").map(|m| m.as_str().into());

        Ok(BackendConfig::S3(S3Config { bucket, key }))
    }

    fn parse_local(matches: regex::Captures) -> Result<Self, StorageError> {
        let path = matches
            .name("path")
            .expect("path regex must contain a path group")
            .as_str();

        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        Ok(BackendConfig::Local(LocalConfig { path }))
    }

    pub(crate) fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::S3(s3) => s3.key.as_ref(),
            // Local stores are rooted at the configured path
            BackendConfig::Local(_) => None,
        }
    }
}

/// Storage provider over an `object_store` backend.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

impl StorageProvider {
    /// Create a storage provider for the given URL with storage options.
    pub async fn for_url_with_options(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        let config = BackendConfig::parse_url(url)?;

        match config {
            BackendConfig::S3(config) => Self::construct_s3(config, options).await,
            BackendConfig::Local(config) => Self::construct_local(config).await,
        }
    }

    /// Qualify a path with the configured key prefix.
    fn qualify_path<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.config.key() {
            Some(prefix) => Cow::Owned(prefix.parts().chain(path.parts()).collect()),
            None => Cow::Borrowed(path),
        }
    }

    fn key_part_count(&self) -> usize {
        self.config
            .key()
            .map(|key| key.parts().count())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStorage for StorageProvider {
    async fn list_table_directories(&self) -> Result<Vec<String>, StorageError> {
        let prefix = self.config.key().cloned();
        let listing = self
            .object_store
            .list_with_delimiter(prefix.as_ref())
            .await
            .context(ObjectStoreSnafu)?;

        let mut directories: Vec<String> = listing
            .common_prefixes
            .iter()
            .filter_map(|p| p.filename().map(str::to_string))
            .collect();

        // Sort for consistent iteration order across runs
        directories.sort();
        directories.dedup();

        Ok(directories)
    }

    async fn list_objects(&self, table: &str) -> Result<Vec<DataObject>, StorageError> {
        let table_prefix: Path = match self.config.key() {
            Some(key) => key.parts().chain(Path::from(table).parts()).collect(),
            None => Path::from(table),
        };

        let key_part_count = self.key_part_count();
        let mut objects = Vec::new();
        let mut stream = self.object_store.list(Some(&table_prefix));

        while let Some(meta) = stream.next().await {
            let meta = meta.context(ObjectStoreSnafu)?;
            // Strip the landing prefix so callers get keys relative to it,
            // matching the contract expected by get()
            let relative: Path = meta.location.parts().skip(key_part_count).collect();
            objects.push(DataObject {
                key: relative.to_string(),
                last_modified: meta.last_modified,
            });
        }

        Ok(objects)
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = Path::from(key);
        let bytes = self
            .object_store
            .get(&self.qualify_path(&path))
            .await
            .context(ObjectStoreSnafu)?
            .bytes()
            .await
            .context(ObjectStoreSnafu)?;
        Ok(bytes)
    }
}
