//! Reconciliation of inferred schemas against existing catalog columns.

use tracing::debug;

use super::{SYNTHETIC_COLUMN_COUNT, TableSchema};

/// Action the synchronizer must take for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableAction {
    /// The table does not exist yet and must be created.
    CreateTable,
    /// The table exists but its column count no longer matches; the listed
    /// columns must be appended. The list may be empty when the source lost
    /// columns, in which case no DDL is issued.
    AddColumns(Vec<String>),
    /// Column counts match; nothing to do.
    NoOp,
}

/// Decide what to do for a table given its inferred schema and the column
/// names currently in the catalog.
///
/// Column-count equality is the only change signal: a rename or type change
/// that keeps the count identical classifies as `NoOp`. The added-column
/// list is the set difference inferred-minus-existing, sorted
/// lexicographically so DDL ordering is deterministic.
pub fn reconcile(inferred: &TableSchema, existing_columns: &[String]) -> TableAction {
    if existing_columns.is_empty() {
        return TableAction::CreateTable;
    }

    if existing_columns.len() == inferred.len() + SYNTHETIC_COLUMN_COUNT {
        return TableAction::NoOp;
    }

    let mut new_columns: Vec<String> = inferred
        .names()
        .filter(|name| !existing_columns.iter().any(|c| c == name))
        .map(str::to_string)
        .collect();
    new_columns.sort();

    debug!(
        existing = existing_columns.len(),
        inferred = inferred.len(),
        added = new_columns.len(),
        "Column counts diverged"
    );

    TableAction::AddColumns(new_columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(names: &[&str]) -> TableSchema {
        TableSchema::from_field_names(names.iter().copied())
    }

    fn existing(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_table_creates() {
        let inferred = schema(&["Op", "id"]);
        assert_eq!(reconcile(&inferred, &[]), TableAction::CreateTable);
    }

    #[test]
    fn test_matching_counts_noop() {
        let inferred = schema(&["Op", "id", "name"]);
        // 3 inferred + 1 synthetic = 4 existing
        let cols = existing(&["SNOWPIPE_INSERTION_TIME", "Op", "id", "name"]);
        assert_eq!(reconcile(&inferred, &cols), TableAction::NoOp);
    }

    #[test]
    fn test_new_columns_sorted() {
        let inferred = schema(&["Op", "id", "zeta", "alpha"]);
        let cols = existing(&["SNOWPIPE_INSERTION_TIME", "Op", "id"]);
        assert_eq!(
            reconcile(&inferred, &cols),
            TableAction::AddColumns(vec!["alpha".to_string(), "zeta".to_string()])
        );
    }

    #[test]
    fn test_same_count_rename_is_noop() {
        // A renamed column keeps the count identical, so the divergence is
        // not detected. This pins the count-based comparison rule.
        let inferred = schema(&["Op", "id", "customer_name"]);
        let cols = existing(&["SNOWPIPE_INSERTION_TIME", "Op", "id", "client_name"]);
        assert_eq!(reconcile(&inferred, &cols), TableAction::NoOp);
    }

    #[test]
    fn test_source_lost_columns_yields_empty_diff() {
        // Existing has more columns than inferred + synthetic: counts
        // diverge but nothing is missing on the warehouse side
        let inferred = schema(&["Op", "id"]);
        let cols = existing(&["SNOWPIPE_INSERTION_TIME", "Op", "id", "legacy"]);
        assert_eq!(reconcile(&inferred, &cols), TableAction::AddColumns(vec![]));
    }

    #[test]
    fn test_diff_is_case_sensitive() {
        // Quoted identifiers preserve case in the catalog, so the diff
        // compares exact names
        let inferred = schema(&["Op", "id", "Name"]);
        let cols = existing(&["SNOWPIPE_INSERTION_TIME", "Op", "id", "name", "extra"]);
        assert_eq!(
            reconcile(&inferred, &cols),
            TableAction::AddColumns(vec!["Name".to_string()])
        );
    }
}
