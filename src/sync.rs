//! Synchronization orchestrator.
//!
//! Walks every table directory under the landing prefix and drives
//! inference, reconciliation, DDL, backfill, and pipe transitions for each
//! one inside an isolated failure boundary. One failed table never aborts
//! its siblings; the run's aggregate outcome reports both sides.

use std::collections::HashSet;
use tracing::{error, info, warn};

use crate::backfill::BackfillLoader;
use crate::catalog::CatalogReader;
use crate::clock::Clock;
use crate::config::Config;
use crate::emit;
use crate::error::SyncError;
use crate::metrics::events::{TableFailed, TableSynced, TablesDiscovered};
use crate::pipe::PipeController;
use crate::schema::inference::{infer_table_schema, sort_newest_first};
use crate::schema::{TableAction, reconcile};
use crate::sql::{CreateStage, SqlContext};
use crate::storage::ObjectStorage;
use crate::table::TableManager;
use crate::warehouse::{Warehouse, WarehouseConnector};

/// Overall status of a synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every table synchronized.
    Success,
    /// Some tables synchronized, some failed; forward progress was made.
    PartialFailure,
    /// The run could not start (connection, stage, or discovery failure).
    Fatal,
}

/// One failed table with its error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFailure {
    pub table: String,
    pub error: String,
}

/// Aggregate result of a synchronization run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub succeeded: Vec<String>,
    pub failed: Vec<TableFailure>,
}

impl RunOutcome {
    fn fatal(error: String) -> Self {
        Self {
            status: RunStatus::Fatal,
            succeeded: Vec::new(),
            failed: vec![TableFailure {
                table: "<run>".to_string(),
                error,
            }],
        }
    }

    /// Whether the run completed without any failure.
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Render an error with its full source chain.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Drives one synchronization run across all table directories.
pub struct Synchronizer<'a> {
    config: &'a Config,
    storage: &'a dyn ObjectStorage,
    clock: &'a dyn Clock,
    context: SqlContext,
}

impl<'a> Synchronizer<'a> {
    pub fn new(config: &'a Config, storage: &'a dyn ObjectStorage, clock: &'a dyn Clock) -> Self {
        let context = SqlContext {
            database: config.warehouse.database.clone(),
            schema: config.warehouse.schema.clone(),
            stage: config.sync.stage.clone(),
        };
        Self {
            config,
            storage,
            clock,
            context,
        }
    }

    /// Run a full synchronization.
    ///
    /// The warehouse session is acquired once up front (failure is fatal
    /// for the whole run) and released exactly once at the end, on every
    /// exit path.
    pub async fn run(&self, connector: &dyn WarehouseConnector) -> RunOutcome {
        let warehouse = match connector.connect().await {
            Ok(warehouse) => warehouse,
            Err(e) => {
                error!(error = %e, "Failed to establish warehouse connection");
                return RunOutcome::fatal(error_chain(&e));
            }
        };

        let outcome = self.run_connected(warehouse.as_ref()).await;

        if let Err(e) = warehouse.close().await {
            warn!(error = %e, "Failed to release warehouse session");
        }

        match outcome.status {
            RunStatus::Success => info!(
                tables = outcome.succeeded.len(),
                "Synchronization run succeeded"
            ),
            RunStatus::PartialFailure => warn!(
                succeeded = outcome.succeeded.len(),
                failed = outcome.failed.len(),
                "Synchronization run made progress but some tables failed"
            ),
            RunStatus::Fatal => error!("Synchronization run failed before processing tables"),
        }

        outcome
    }

    async fn run_connected(&self, warehouse: &dyn Warehouse) -> RunOutcome {
        // The stage must exist before any pipe or bulk load references it
        let stage = CreateStage {
            context: &self.context,
            url: &self.config.storage.url,
            credentials: self.config.sync.stage_credentials.as_ref(),
        };
        if let Err(e) = warehouse.execute(&stage.sql()).await {
            return RunOutcome::fatal(error_chain(&e));
        }

        let directories = match self.storage.list_table_directories().await {
            Ok(directories) => directories,
            Err(e) => return RunOutcome::fatal(error_chain(&e)),
        };

        let tables: Vec<String> = directories
            .into_iter()
            .filter(|table| !self.config.is_excluded(table))
            .collect();

        emit!(TablesDiscovered {
            count: tables.len() as u64,
        });
        info!(tables = tables.len(), "Discovered table directories");

        let catalog = CatalogReader::new(warehouse, &self.context);

        // Pipes are listed once for the whole run, not per table
        let pipes = match catalog.pipe_names().await {
            Ok(pipes) => pipes,
            Err(e) => return RunOutcome::fatal(error_chain(&e)),
        };

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        for (index, table) in tables.iter().enumerate() {
            match self.sync_table(warehouse, &catalog, &pipes, table).await {
                Ok(table_name) => {
                    emit!(TableSynced);
                    info!(
                        target = %table_name,
                        progress = %format!("{}/{}", index + 1, tables.len()),
                        "Table synchronized"
                    );
                    succeeded.push(table_name);
                }
                Err(e) => {
                    emit!(TableFailed);
                    let message = error_chain(&e);
                    warn!(target = %table, error = %message, "Table failed; continuing");
                    failed.push(TableFailure {
                        table: table.clone(),
                        error: message,
                    });
                }
            }
        }

        let status = if failed.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::PartialFailure
        };

        RunOutcome {
            status,
            succeeded,
            failed,
        }
    }

    /// Synchronize a single table directory. Returns the warehouse table
    /// name on success.
    async fn sync_table(
        &self,
        warehouse: &dyn Warehouse,
        catalog: &CatalogReader<'_>,
        pipes: &HashSet<String>,
        directory: &str,
    ) -> Result<String, SyncError> {
        let table_name = directory.to_uppercase();
        let pipe_name = format!("{}_PIPE", table_name);
        let pipe_exists = pipes.contains(&pipe_name);

        let mut objects = self.storage.list_objects(directory).await?;
        sort_newest_first(&mut objects);

        let schema = infer_table_schema(self.storage, directory, &objects).await?;

        let existing = catalog.existing_columns(&table_name).await?;
        let action = reconcile(&schema, &existing);

        let manager = TableManager::new(warehouse, &self.context);
        let mut schema_changed = false;

        match &action {
            TableAction::CreateTable => {
                manager.create_table(&table_name, &schema).await?;

                let loader = BackfillLoader::new(
                    warehouse,
                    &self.context,
                    self.clock,
                    self.config.sync.backfill_retention_days,
                );
                loader
                    .load_historic(&table_name, directory, &schema, &objects)
                    .await?;
            }
            TableAction::AddColumns(columns) => {
                // An empty diff means the source lost columns; nothing to
                // add and the pipe projection is unchanged
                if !columns.is_empty() {
                    manager.add_columns(&table_name, columns).await?;
                    schema_changed = true;
                }
            }
            TableAction::NoOp => {}
        }

        if schema_changed || !pipe_exists {
            let controller = PipeController::new(
                warehouse,
                &self.context,
                self.clock,
                &self.config.sync.pause_poll,
            );
            controller
                .ensure_running(
                    &table_name,
                    directory,
                    &pipe_name,
                    &schema,
                    pipe_exists,
                    schema_changed,
                )
                .await?;
        }

        Ok(table_name)
    }
}
