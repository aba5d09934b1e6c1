//! snowdrift: keeps warehouse tables and their auto-ingest pipes in sync
//! with the schema of partitioned parquet files landing in object storage.
//!
//! Each run discovers the table directories under a landing prefix, infers
//! each table's schema from its newest parquet file, reconciles it against
//! the warehouse catalog, creates tables or appends columns as needed,
//! bulk-loads historic files at table creation, and pauses/redefines/
//! resumes the auto-ingest pipe whenever the column set changed.
//!
//! # Example
//!
//! ```ignore
//! use snowdrift::clock::SystemClock;
//! use snowdrift::warehouse::RestConnector;
//! use snowdrift::{Config, StorageProvider, Synchronizer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_file("config.yaml".as_ref()).unwrap();
//!     let storage = StorageProvider::for_url_with_options(
//!         &config.storage.url,
//!         config.storage.storage_options.clone(),
//!     )
//!     .await
//!     .unwrap();
//!     let connector = RestConnector::new(config.warehouse.clone());
//!     let clock = SystemClock;
//!
//!     let synchronizer = Synchronizer::new(&config, &storage, &clock);
//!     let outcome = synchronizer.run(&connector).await;
//!     println!("{} tables synchronized", outcome.succeeded.len());
//! }
//! ```

pub mod backfill;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipe;
pub mod schema;
pub mod sql;
pub mod storage;
pub mod sync;
pub mod table;
pub mod warehouse;

// Re-export main types
pub use config::Config;
pub use storage::{DataObject, ObjectStorage, StorageProvider};
pub use sync::{RunOutcome, RunStatus, Synchronizer, TableFailure};
