//! Read-only catalog queries.

use std::collections::HashSet;

use crate::error::CatalogError;
use crate::sql::{SelectColumns, SelectPipes, SqlContext};
use crate::warehouse::Warehouse;

/// Reader for the warehouse catalog's view of tables and pipes.
pub struct CatalogReader<'a> {
    warehouse: &'a dyn Warehouse,
    context: &'a SqlContext,
}

impl<'a> CatalogReader<'a> {
    pub fn new(warehouse: &'a dyn Warehouse, context: &'a SqlContext) -> Self {
        Self { warehouse, context }
    }

    /// Physical column names of a table in ordinal order; empty when the
    /// table does not exist.
    pub async fn existing_columns(&self, table: &str) -> Result<Vec<String>, CatalogError> {
        let statement = SelectColumns {
            context: self.context,
            table,
        }
        .sql();

        let rows = self.warehouse.execute(&statement).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }

    /// Names of all pipes in the target schema, uppercased. Queried once
    /// per run.
    pub async fn pipe_names(&self) -> Result<HashSet<String>, CatalogError> {
        let statement = SelectPipes {
            context: self.context,
        }
        .sql();

        let rows = self.warehouse.execute(&statement).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .map(|name| name.to_uppercase())
            .collect())
    }
}
