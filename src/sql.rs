//! Parameterized SQL statement builders.
//!
//! Every statement the synchronizer issues is built here, one builder per
//! operation, so identifier quoting and literal escaping live in a single
//! place instead of ad hoc string interpolation at call sites.

use crate::config::StageCredentials;
use crate::schema::{ColumnType, INSERTION_TIME_COLUMN, TableSchema};

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Naming context shared by all statements in a run: the target database,
/// schema, and stage.
#[derive(Debug, Clone)]
pub struct SqlContext {
    pub database: String,
    pub schema: String,
    pub stage: String,
}

impl SqlContext {
    /// Fully-qualified, quoted object name: `"DB"."SCHEMA"."NAME"`.
    pub fn qualified(&self, name: &str) -> String {
        format!(
            "{}.{}.{}",
            quote_ident(&self.database),
            quote_ident(&self.schema),
            quote_ident(name)
        )
    }

    /// Dotted, unquoted object name as used inside string arguments:
    /// `DB.SCHEMA.NAME`.
    pub fn dotted(&self, name: &str) -> String {
        format!("{}.{}.{}", self.database, self.schema, name)
    }

    /// Stage location reference: `@DB.SCHEMA.STAGE/suffix`.
    pub fn stage_ref(&self, suffix: &str) -> String {
        format!(
            "@{}.{}.{}/{}",
            self.database, self.schema, self.stage, suffix
        )
    }
}

/// Column projection shared by pipes and bulk loads: the insertion
/// timestamp from the load operation's own scan time, then each column cast
/// from the file's native representation.
fn copy_projection(schema: &TableSchema) -> String {
    let mut parts = Vec::with_capacity(schema.len() + 1);
    parts.push(format!(
        "TO_TIMESTAMP(METADATA$START_SCAN_TIME)::{} AS {}",
        ColumnType::TimestampNtz.sql_type(),
        INSERTION_TIME_COLUMN.to_ascii_lowercase()
    ));
    for (name, ty) in schema.iter() {
        parts.push(format!("$1:{}::{}", name, ty.sql_type()));
    }
    parts.join(", ")
}

/// `CREATE STAGE IF NOT EXISTS` pointing at the landing location.
pub struct CreateStage<'a> {
    pub context: &'a SqlContext,
    pub url: &'a str,
    pub credentials: Option<&'a StageCredentials>,
}

impl CreateStage<'_> {
    pub fn sql(&self) -> String {
        let mut statement = format!(
            "CREATE STAGE IF NOT EXISTS {} URL={}",
            self.context.dotted(&self.context.stage),
            quote_literal(self.url)
        );
        if let Some(credentials) = self.credentials {
            statement.push_str(&format!(
                " CREDENTIALS = (AWS_KEY_ID = {} AWS_SECRET_KEY = {})",
                quote_literal(&credentials.access_key),
                quote_literal(&credentials.secret_key)
            ));
        }
        statement
    }
}

/// Pipe names registered in the target schema.
pub struct SelectPipes<'a> {
    pub context: &'a SqlContext,
}

impl SelectPipes<'_> {
    pub fn sql(&self) -> String {
        format!(
            "SELECT PIPE_NAME FROM {}.INFORMATION_SCHEMA.PIPES WHERE PIPE_SCHEMA = {}",
            self.context.database,
            quote_literal(&self.context.schema)
        )
    }
}

/// Physical columns of one table, in ordinal order.
pub struct SelectColumns<'a> {
    pub context: &'a SqlContext,
    pub table: &'a str,
}

impl SelectColumns<'_> {
    pub fn sql(&self) -> String {
        format!(
            "SELECT COLUMN_NAME FROM {}.INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_NAME = {} AND TABLE_SCHEMA = {} ORDER BY ORDINAL_POSITION",
            self.context.database,
            quote_literal(self.table),
            quote_literal(&self.context.schema)
        )
    }
}

/// `CREATE TABLE IF NOT EXISTS` with the insertion timestamp first and the
/// inferred columns following in inferred order.
pub struct CreateTable<'a> {
    pub context: &'a SqlContext,
    pub table: &'a str,
    pub schema: &'a TableSchema,
}

impl CreateTable<'_> {
    pub fn sql(&self) -> String {
        let mut columns = Vec::with_capacity(self.schema.len() + 1);
        columns.push(format!(
            "{} {}",
            quote_ident(INSERTION_TIME_COLUMN),
            ColumnType::TimestampNtz.sql_type()
        ));
        for (name, ty) in self.schema.iter() {
            columns.push(format!("{} {}", quote_ident(name), ty.sql_type()));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.context.qualified(self.table),
            columns.join(", ")
        )
    }
}

/// Append one text column to a table.
pub struct AddColumn<'a> {
    pub context: &'a SqlContext,
    pub table: &'a str,
    pub column: &'a str,
}

impl AddColumn<'_> {
    pub fn sql(&self) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.context.qualified(self.table),
            quote_ident(self.column),
            ColumnType::Text.sql_type()
        )
    }
}

/// Bulk-load one staged file into a table.
pub struct CopyInto<'a> {
    pub context: &'a SqlContext,
    pub table: &'a str,
    /// Path under the stage, e.g. `orders/part-0001.parquet`.
    pub stage_suffix: &'a str,
    pub schema: &'a TableSchema,
}

impl CopyInto<'_> {
    pub fn sql(&self) -> String {
        format!(
            "COPY INTO {} FROM (SELECT {} FROM {}) FILE_FORMAT = (TYPE = PARQUET)",
            self.context.qualified(self.table),
            copy_projection(self.schema),
            self.context.stage_ref(self.stage_suffix)
        )
    }
}

/// Create or replace an auto-ingest pipe over a table directory.
pub struct CreatePipe<'a> {
    pub context: &'a SqlContext,
    pub pipe: &'a str,
    pub table: &'a str,
    /// Table directory under the stage, e.g. `orders`.
    pub directory: &'a str,
    pub schema: &'a TableSchema,
}

impl CreatePipe<'_> {
    pub fn sql(&self) -> String {
        format!(
            "CREATE OR REPLACE PIPE {} AUTO_INGEST = TRUE AS \
             COPY INTO {} FROM (SELECT {} FROM {}) FILE_FORMAT = (TYPE = PARQUET)",
            self.context.qualified(self.pipe),
            self.context.qualified(self.table),
            copy_projection(self.schema),
            self.context.stage_ref(&format!("{}/", self.directory))
        )
    }
}

/// Pause or resume a pipe.
pub struct AlterPipePaused<'a> {
    pub context: &'a SqlContext,
    pub pipe: &'a str,
    pub paused: bool,
}

impl AlterPipePaused<'_> {
    pub fn sql(&self) -> String {
        format!(
            "ALTER PIPE {} SET PIPE_EXECUTION_PAUSED={}",
            self.context.qualified(self.pipe),
            self.paused
        )
    }
}

/// Query a pipe's execution state and pending file count.
pub struct PipeStatus<'a> {
    pub context: &'a SqlContext,
    pub pipe: &'a str,
}

impl PipeStatus<'_> {
    pub fn sql(&self) -> String {
        format!(
            "SELECT SYSTEM$PIPE_STATUS({})",
            quote_literal(&self.context.dotted(self.pipe))
        )
    }
}

/// Refresh a pipe so it picks up files that arrived while it was paused or
/// before it existed.
pub struct RefreshPipe<'a> {
    pub context: &'a SqlContext,
    pub pipe: &'a str,
}

impl RefreshPipe<'_> {
    pub fn sql(&self) -> String {
        format!("ALTER PIPE {} REFRESH", self.context.qualified(self.pipe))
    }
}
