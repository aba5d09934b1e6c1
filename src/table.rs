//! Additive table DDL.

use tracing::info;

use crate::emit;
use crate::error::CatalogError;
use crate::metrics::events::{DdlIssued, DdlKind};
use crate::schema::TableSchema;
use crate::sql::{AddColumn, CreateTable, SqlContext};
use crate::warehouse::Warehouse;

/// Issues create-table and add-column statements.
///
/// Both operations are additive only; this subsystem never drops or
/// reorders columns, and never drops tables.
pub struct TableManager<'a> {
    warehouse: &'a dyn Warehouse,
    context: &'a SqlContext,
}

impl<'a> TableManager<'a> {
    pub fn new(warehouse: &'a dyn Warehouse, context: &'a SqlContext) -> Self {
        Self { warehouse, context }
    }

    /// Create the table with the insertion timestamp first and the inferred
    /// columns following in inferred order. The caller guarantees the table
    /// is absent; the statement is still guarded with IF NOT EXISTS so a
    /// retried run is idempotent.
    pub async fn create_table(
        &self,
        table: &str,
        schema: &TableSchema,
    ) -> Result<(), CatalogError> {
        let statement = CreateTable {
            context: self.context,
            table,
            schema,
        }
        .sql();

        self.warehouse.execute(&statement).await?;
        emit!(DdlIssued {
            kind: DdlKind::CreateTable,
        });

        info!(
            target = %table,
            columns = schema.len() + 1,
            "Created table"
        );

        Ok(())
    }

    /// Append new columns, one statement per column, each typed as text.
    /// Any failure propagates; there is no partial-add recovery.
    pub async fn add_columns(&self, table: &str, columns: &[String]) -> Result<(), CatalogError> {
        for column in columns {
            let statement = AddColumn {
                context: self.context,
                table,
                column,
            }
            .sql();

            self.warehouse.execute(&statement).await?;
            emit!(DdlIssued {
                kind: DdlKind::AddColumn,
            });

            info!(
                target = %table,
                column = %column,
                "Added column"
            );
        }

        Ok(())
    }
}
