//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in a synchronization
//! run. Events implement the `InternalEvent` trait which emits the
//! corresponding counter metric.

use metrics::counter;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted when table directories are discovered in storage.
pub struct TablesDiscovered {
    pub count: u64,
}

impl InternalEvent for TablesDiscovered {
    fn emit(self) {
        trace!(count = self.count, "Tables discovered");
        counter!("snowdrift_tables_discovered_total").increment(self.count);
    }
}

/// Event emitted when a table finishes synchronizing successfully.
pub struct TableSynced;

impl InternalEvent for TableSynced {
    fn emit(self) {
        trace!("Table synced");
        counter!("snowdrift_tables_synced_total").increment(1);
    }
}

/// Event emitted when a table's synchronization fails.
pub struct TableFailed;

impl InternalEvent for TableFailed {
    fn emit(self) {
        trace!("Table failed");
        counter!("snowdrift_tables_failed_total").increment(1);
    }
}

/// Event emitted when a DDL statement is issued against the catalog.
pub struct DdlIssued {
    pub kind: DdlKind,
}

/// Kind of DDL statement issued.
#[derive(Debug, Clone, Copy)]
pub enum DdlKind {
    CreateTable,
    AddColumn,
    CreatePipe,
}

impl DdlKind {
    fn as_str(&self) -> &'static str {
        match self {
            DdlKind::CreateTable => "create_table",
            DdlKind::AddColumn => "add_column",
            DdlKind::CreatePipe => "create_pipe",
        }
    }
}

impl InternalEvent for DdlIssued {
    fn emit(self) {
        trace!(kind = self.kind.as_str(), "DDL issued");
        counter!("snowdrift_ddl_statements_total", "kind" => self.kind.as_str()).increment(1);
    }
}

/// Event emitted when historic files are bulk-loaded at table creation.
pub struct HistoricFilesLoaded {
    pub count: u64,
}

impl InternalEvent for HistoricFilesLoaded {
    fn emit(self) {
        trace!(count = self.count, "Historic files loaded");
        counter!("snowdrift_historic_files_loaded_total").increment(self.count);
    }
}

/// Event emitted for each pipe status poll during a pause/drain wait.
pub struct PipeDrainPoll;

impl InternalEvent for PipeDrainPoll {
    fn emit(self) {
        trace!("Pipe drain poll");
        counter!("snowdrift_pipe_drain_polls_total").increment(1);
    }
}
