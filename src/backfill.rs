//! Historic backfill at table creation.
//!
//! A freshly created table starts empty while its directory may already
//! hold months of files. The pipe's refresh only reaches back a limited
//! window, so files older than the retention cutoff are bulk-loaded here,
//! one statement per file. Single-file statements bound per-statement
//! resource usage and leave already-loaded files in place when a later one
//! fails (at-least-once on retry).

use chrono::Duration;
use tracing::info;

use crate::clock::Clock;
use crate::emit;
use crate::error::CatalogError;
use crate::metrics::events::HistoricFilesLoaded;
use crate::schema::TableSchema;
use crate::sql::{CopyInto, SqlContext};
use crate::storage::DataObject;
use crate::warehouse::Warehouse;

/// Loads pre-existing files older than the retention cutoff.
pub struct BackfillLoader<'a> {
    warehouse: &'a dyn Warehouse,
    context: &'a SqlContext,
    clock: &'a dyn Clock,
    retention_days: i64,
}

impl<'a> BackfillLoader<'a> {
    pub fn new(
        warehouse: &'a dyn Warehouse,
        context: &'a SqlContext,
        clock: &'a dyn Clock,
        retention_days: i64,
    ) -> Self {
        Self {
            warehouse,
            context,
            clock,
            retention_days,
        }
    }

    /// Load every object whose last-modified timestamp is strictly older
    /// than now minus the retention window. Returns the number of files
    /// loaded. Must only be called immediately after a successful table
    /// creation.
    pub async fn load_historic(
        &self,
        table: &str,
        directory: &str,
        schema: &TableSchema,
        objects: &[DataObject],
    ) -> Result<usize, CatalogError> {
        let cutoff = self.clock.now() - Duration::days(self.retention_days);

        let mut loaded = 0usize;
        for object in objects.iter().filter(|o| o.last_modified < cutoff) {
            let suffix = format!("{}/{}", directory, object.basename());
            let statement = CopyInto {
                context: self.context,
                table,
                stage_suffix: &suffix,
                schema,
            }
            .sql();

            self.warehouse.execute(&statement).await?;
            loaded += 1;

            info!(
                target = %table,
                file = object.basename(),
                "Loaded historic file"
            );
        }

        if loaded > 0 {
            emit!(HistoricFilesLoaded {
                count: loaded as u64,
            });
            info!(target = %table, files = loaded, "Historic backfill complete");
        }

        Ok(loaded)
    }
}
