//! Pipe lifecycle control.
//!
//! A pipe's copy definition must always match its table's current column
//! set. Whenever reconciliation added columns, the pipe has to be paused,
//! drained of pending files, redefined with the new projection, refreshed,
//! and resumed, in that order; resuming before the drain completes would
//! load files through the stale projection. A pipe that does not exist yet
//! skips the pause/drain sub-machine and goes straight to definition.
//!
//! The drain wait polls `SYSTEM$PIPE_STATUS` with a multiplicative backoff
//! and a bounded attempt budget; exhausting the budget surfaces
//! [`PipeError::DrainTimeout`] and leaves the pipe paused for operator
//! intervention.

use serde::Deserialize;
use snafu::prelude::*;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::PausePollConfig;
use crate::emit;
use crate::error::{DrainTimeoutSnafu, PipeError, StatusEmptySnafu, StatusParseSnafu};
use crate::metrics::events::{DdlIssued, DdlKind, PipeDrainPoll};
use crate::schema::TableSchema;
use crate::sql::{AlterPipePaused, CreatePipe, PipeStatus, RefreshPipe, SqlContext};
use crate::warehouse::Warehouse;

/// Lifecycle states of a pipe during a controlled transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeState {
    Running,
    PausingRequested,
    PausedDraining,
    PausedDrained,
    Redefining,
    Resuming,
}

/// Pipe status payload returned by `SYSTEM$PIPE_STATUS`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipeStatusReport {
    execution_state: String,
    pending_file_count: i64,
}

impl PipeStatusReport {
    fn is_paused(&self) -> bool {
        self.execution_state == "PAUSED"
    }

    fn is_drained(&self) -> bool {
        self.is_paused() && self.pending_file_count == 0
    }
}

/// Drives a pipe through the pause/drain/redefine/resume sequence.
pub struct PipeController<'a> {
    warehouse: &'a dyn Warehouse,
    context: &'a SqlContext,
    clock: &'a dyn Clock,
    poll: &'a PausePollConfig,
}

impl<'a> PipeController<'a> {
    pub fn new(
        warehouse: &'a dyn Warehouse,
        context: &'a SqlContext,
        clock: &'a dyn Clock,
        poll: &'a PausePollConfig,
    ) -> Self {
        Self {
            warehouse,
            context,
            clock,
            poll,
        }
    }

    /// Bring the pipe to the running state with a copy definition matching
    /// the table's current columns.
    ///
    /// Invoked only when reconciliation added columns or the pipe does not
    /// exist yet. The final resume is unconditional on this path: newly
    /// created pipes also pass through an explicit ensure-running step.
    pub async fn ensure_running(
        &self,
        table: &str,
        directory: &str,
        pipe: &str,
        schema: &TableSchema,
        pipe_exists: bool,
        schema_changed: bool,
    ) -> Result<(), PipeError> {
        if pipe_exists && schema_changed {
            self.pause_and_drain(pipe).await?;
        }

        debug!(pipe = %pipe, state = ?PipeState::Redefining, "Redefining pipe");

        let create = CreatePipe {
            context: self.context,
            pipe,
            table,
            directory,
            schema,
        }
        .sql();
        self.warehouse.execute(&create).await?;
        emit!(DdlIssued {
            kind: DdlKind::CreatePipe,
        });

        // Pick up files that arrived while the pipe was paused or absent
        let refresh = RefreshPipe {
            context: self.context,
            pipe,
        }
        .sql();
        self.warehouse.execute(&refresh).await?;

        debug!(pipe = %pipe, state = ?PipeState::Resuming, "Resuming pipe");

        let resume = AlterPipePaused {
            context: self.context,
            pipe,
            paused: false,
        }
        .sql();
        self.warehouse.execute(&resume).await?;

        info!(pipe = %pipe, target = %table, "Pipe running");

        Ok(())
    }

    /// Pause the pipe and poll until it reports paused with zero pending
    /// files.
    ///
    /// The wait between polls starts at the configured initial delay and
    /// grows by the backoff factor after each unsatisfied poll. A status
    /// that reports not-paused re-issues the pause command. The attempt
    /// budget bounds the wait; the pipe may be left paused on failure.
    async fn pause_and_drain(&self, pipe: &str) -> Result<(), PipeError> {
        let pause = AlterPipePaused {
            context: self.context,
            pipe,
            paused: true,
        }
        .sql();

        self.warehouse.execute(&pause).await?;
        let mut state = PipeState::PausingRequested;
        debug!(pipe = %pipe, state = ?state, "Pause requested");

        let mut delay = Duration::from_secs_f64(self.poll.initial_delay_secs);

        for attempt in 1..=self.poll.max_attempts {
            emit!(PipeDrainPoll);

            let status = self.pipe_status(pipe).await?;

            if status.is_drained() {
                state = PipeState::PausedDrained;
                debug!(pipe = %pipe, state = ?state, attempts = attempt, "Pipe drained");
                return Ok(());
            }

            state = if status.is_paused() {
                PipeState::PausedDraining
            } else {
                PipeState::PausingRequested
            };

            debug!(
                pipe = %pipe,
                state = ?state,
                execution_state = %status.execution_state,
                pending_files = status.pending_file_count,
                attempt,
                "Pipe not drained yet"
            );

            if !status.is_paused() {
                // Some other actor resumed it, or the pause has not taken
                // effect; ask again
                self.warehouse.execute(&pause).await?;
            }

            self.clock.sleep(delay).await;
            delay = delay.mul_f64(self.poll.backoff_factor);
        }

        warn!(pipe = %pipe, attempts = self.poll.max_attempts, "Drain wait exhausted; pipe left paused");

        DrainTimeoutSnafu {
            pipe,
            attempts: self.poll.max_attempts,
        }
        .fail()
    }

    async fn pipe_status(&self, pipe: &str) -> Result<PipeStatusReport, PipeError> {
        let statement = PipeStatus {
            context: self.context,
            pipe,
        }
        .sql();

        let rows = self.warehouse.execute(&statement).await?;

        let payload = rows
            .first()
            .and_then(|row| row.first())
            .context(StatusEmptySnafu { pipe })?;

        serde_json::from_str(payload).context(StatusParseSnafu { pipe })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::warehouse::Row;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    /// Warehouse that records statements and scripts pipe-status replies.
    struct ScriptedWarehouse {
        statements: Mutex<Vec<String>>,
        status_replies: Mutex<Vec<String>>,
    }

    impl ScriptedWarehouse {
        fn new(status_replies: Vec<&str>) -> Self {
            Self {
                statements: Mutex::new(Vec::new()),
                status_replies: Mutex::new(status_replies.into_iter().map(String::from).collect()),
            }
        }

        fn statements(&self) -> Vec<String> {
            self.statements.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Warehouse for ScriptedWarehouse {
        async fn execute(&self, statement: &str) -> Result<Vec<Row>, CatalogError> {
            self.statements.lock().unwrap().push(statement.to_string());
            if statement.contains("SYSTEM$PIPE_STATUS") {
                let mut replies = self.status_replies.lock().unwrap();
                if replies.is_empty() {
                    return Ok(vec![vec![
                        r#"{"executionState": "PAUSED", "pendingFileCount": 0}"#.to_string(),
                    ]]);
                }
                let reply = replies.remove(0);
                return Ok(vec![vec![reply]]);
            }
            Ok(vec![])
        }

        async fn close(&self) -> Result<(), CatalogError> {
            Ok(())
        }
    }

    /// Clock that records sleeps instead of waiting.
    struct RecordingClock {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl RecordingClock {
        fn new() -> Self {
            Self {
                sleeps: Mutex::new(Vec::new()),
            }
        }

        fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Clock for RecordingClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }

        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn context() -> SqlContext {
        SqlContext {
            database: "DB".to_string(),
            schema: "SCH".to_string(),
            stage: "stg".to_string(),
        }
    }

    fn schema() -> TableSchema {
        let mut schema = TableSchema::from_field_names(["id"]);
        schema.ensure_operation_tag();
        schema
    }

    fn poll_config(max_attempts: u32) -> PausePollConfig {
        PausePollConfig {
            initial_delay_secs: 2.0,
            backoff_factor: 1.3,
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_new_pipe_skips_pause_and_drain() {
        let warehouse = ScriptedWarehouse::new(vec![]);
        let clock = RecordingClock::new();
        let context = context();
        let poll = poll_config(30);
        let controller = PipeController::new(&warehouse, &context, &clock, &poll);

        controller
            .ensure_running("ORDERS", "orders", "ORDERS_PIPE", &schema(), false, false)
            .await
            .unwrap();

        let statements = warehouse.statements();
        assert_eq!(statements.len(), 3);
        assert!(statements[0].starts_with("CREATE OR REPLACE PIPE"));
        assert!(statements[1].ends_with("REFRESH"));
        assert!(statements[2].ends_with("PIPE_EXECUTION_PAUSED=false"));
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_schema_change_follows_full_sequence() {
        let warehouse = ScriptedWarehouse::new(vec![
            r#"{"executionState": "RUNNING", "pendingFileCount": 3}"#,
            r#"{"executionState": "PAUSED", "pendingFileCount": 1}"#,
            r#"{"executionState": "PAUSED", "pendingFileCount": 0}"#,
        ]);
        let clock = RecordingClock::new();
        let context = context();
        let poll = poll_config(30);
        let controller = PipeController::new(&warehouse, &context, &clock, &poll);

        controller
            .ensure_running("ORDERS", "orders", "ORDERS_PIPE", &schema(), true, true)
            .await
            .unwrap();

        let statements = warehouse.statements();
        // pause, status, re-pause (not paused yet), status, status,
        // create, refresh, resume
        assert!(statements[0].ends_with("PIPE_EXECUTION_PAUSED=true"));
        assert!(statements[1].contains("SYSTEM$PIPE_STATUS"));
        assert!(statements[2].ends_with("PIPE_EXECUTION_PAUSED=true"));
        assert!(statements[3].contains("SYSTEM$PIPE_STATUS"));
        assert!(statements[4].contains("SYSTEM$PIPE_STATUS"));
        assert!(statements[5].starts_with("CREATE OR REPLACE PIPE"));
        assert!(statements[6].ends_with("REFRESH"));
        assert!(statements[7].ends_with("PIPE_EXECUTION_PAUSED=false"));
        assert_eq!(statements.len(), 8);

        // Resume is never issued before the drained observation
        let resume_position = statements
            .iter()
            .position(|s| s.ends_with("PIPE_EXECUTION_PAUSED=false"))
            .unwrap();
        let last_status_position = statements
            .iter()
            .rposition(|s| s.contains("SYSTEM$PIPE_STATUS"))
            .unwrap();
        assert!(last_status_position < resume_position);
    }

    #[tokio::test]
    async fn test_drain_wait_backs_off_multiplicatively() {
        let warehouse = ScriptedWarehouse::new(vec![
            r#"{"executionState": "PAUSED", "pendingFileCount": 2}"#,
            r#"{"executionState": "PAUSED", "pendingFileCount": 1}"#,
            r#"{"executionState": "PAUSED", "pendingFileCount": 0}"#,
        ]);
        let clock = RecordingClock::new();
        let context = context();
        let poll = poll_config(30);
        let controller = PipeController::new(&warehouse, &context, &clock, &poll);

        controller
            .ensure_running("ORDERS", "orders", "ORDERS_PIPE", &schema(), true, true)
            .await
            .unwrap();

        let sleeps = clock.sleeps();
        assert_eq!(sleeps.len(), 2);
        assert_eq!(sleeps[0], Duration::from_secs_f64(2.0));
        assert_eq!(sleeps[1], Duration::from_secs_f64(2.0).mul_f64(1.3));
    }

    #[tokio::test]
    async fn test_drain_timeout_surfaces_distinct_error() {
        let warehouse = ScriptedWarehouse::new(vec![
            r#"{"executionState": "PAUSED", "pendingFileCount": 5}"#,
            r#"{"executionState": "PAUSED", "pendingFileCount": 5}"#,
            r#"{"executionState": "PAUSED", "pendingFileCount": 5}"#,
        ]);
        let clock = RecordingClock::new();
        let context = context();
        let poll = poll_config(3);
        let controller = PipeController::new(&warehouse, &context, &clock, &poll);

        let result = controller
            .ensure_running("ORDERS", "orders", "ORDERS_PIPE", &schema(), true, true)
            .await;

        match result.unwrap_err() {
            PipeError::DrainTimeout { pipe, attempts } => {
                assert_eq!(pipe, "ORDERS_PIPE");
                assert_eq!(attempts, 3);
            }
            e => panic!("Expected DrainTimeout, got: {e:?}"),
        }

        // The pipe is left paused: no redefine or resume was issued
        let statements = warehouse.statements();
        assert!(!statements.iter().any(|s| s.starts_with("CREATE OR REPLACE")));
        assert!(
            !statements
                .iter()
                .any(|s| s.ends_with("PIPE_EXECUTION_PAUSED=false"))
        );
    }

    #[tokio::test]
    async fn test_malformed_status_payload_fails() {
        let warehouse = ScriptedWarehouse::new(vec![r#"{"executionState": "PAUSED"}"#]);
        let clock = RecordingClock::new();
        let context = context();
        let poll = poll_config(3);
        let controller = PipeController::new(&warehouse, &context, &clock, &poll);

        let result = controller
            .ensure_running("ORDERS", "orders", "ORDERS_PIPE", &schema(), true, true)
            .await;

        assert!(matches!(
            result.unwrap_err(),
            PipeError::StatusParse { .. }
        ));
    }
}
