//! Table schema model.
//!
//! Source files carry arbitrary column sets; the warehouse side collapses
//! every inferred column to a generic text type and adds two synthetic
//! columns: the insertion timestamp (always the first physical column) and
//! the operation tag (first inferred column, injected when the sample file
//! does not carry one).

pub mod inference;
pub mod reconcile;

pub use inference::infer_table_schema;
pub use reconcile::{TableAction, reconcile};

use indexmap::IndexMap;

/// Synthetic column recording when the load operation ran. Always the first
/// physical column of every managed table.
pub const INSERTION_TIME_COLUMN: &str = "SNOWPIPE_INSERTION_TIME";

/// Operation-tag column emitted by change-data-capture producers. Injected
/// into the inferred schema when the sample file predates CDC (initial-load
/// files have no tag).
pub const OPERATION_TAG_COLUMN: &str = "Op";

/// Number of synthetic columns that exist only on the warehouse side (the
/// operation tag lives in the inferred schema, so it is not counted here).
pub const SYNTHETIC_COLUMN_COUNT: usize = 1;

/// Internal fields excluded from inference.
const RESERVED_FIELDS: &[&str] = &["schema"];

/// Primitive warehouse column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Generic text; every inferred column collapses to this.
    Text,
    /// Timestamp without time zone; used by the insertion-time column.
    TimestampNtz,
}

impl ColumnType {
    /// SQL type name.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::TimestampNtz => "TIMESTAMP_NTZ",
        }
    }
}

/// Ordered column-name to type mapping inferred from a sample file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    columns: IndexMap<String, ColumnType>,
}

impl TableSchema {
    /// Build a schema from field names in file order, dropping reserved
    /// internal fields. Every column is typed as text.
    pub fn from_field_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = names
            .into_iter()
            .map(Into::into)
            .filter(|name| !RESERVED_FIELDS.iter().any(|r| r.eq_ignore_ascii_case(name)))
            .map(|name| (name, ColumnType::Text))
            .collect();
        Self { columns }
    }

    /// Inject the operation-tag column as the first inferred column if no
    /// column matches it case-insensitively, preserving the order of all
    /// other columns.
    pub fn ensure_operation_tag(&mut self) {
        if !self.contains(OPERATION_TAG_COLUMN) {
            self.columns
                .shift_insert(0, OPERATION_TAG_COLUMN.to_string(), ColumnType::Text);
        }
    }

    /// Case-insensitive column membership.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.keys().any(|c| c.eq_ignore_ascii_case(name))
    }

    /// Column names in inferred order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Columns with their types, in inferred order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.columns.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Number of inferred columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_field_names_preserves_order() {
        let schema = TableSchema::from_field_names(["id", "name", "created_at"]);
        let names: Vec<_> = schema.names().collect();
        assert_eq!(names, vec!["id", "name", "created_at"]);
        assert!(schema.iter().all(|(_, ty)| ty == ColumnType::Text));
    }

    #[test]
    fn test_reserved_field_excluded() {
        let schema = TableSchema::from_field_names(["id", "schema", "SCHEMA", "name"]);
        let names: Vec<_> = schema.names().collect();
        assert_eq!(names, vec!["id", "name"]);
    }

    #[test]
    fn test_operation_tag_injected_first() {
        let mut schema = TableSchema::from_field_names(["id", "name"]);
        schema.ensure_operation_tag();
        let names: Vec<_> = schema.names().collect();
        assert_eq!(names, vec!["Op", "id", "name"]);
    }

    #[test]
    fn test_operation_tag_detected_case_insensitively() {
        let mut schema = TableSchema::from_field_names(["OP", "id"]);
        schema.ensure_operation_tag();
        let names: Vec<_> = schema.names().collect();
        // Already present as "OP"; nothing is injected
        assert_eq!(names, vec!["OP", "id"]);
    }

    #[test]
    fn test_sql_types() {
        assert_eq!(ColumnType::Text.sql_type(), "TEXT");
        assert_eq!(ColumnType::TimestampNtz.sql_type(), "TIMESTAMP_NTZ");
    }
}
