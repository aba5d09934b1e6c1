//! Schema inference from parquet sample files.
//!
//! One representative file per table directory is enough: the
//! most-recently-modified object carries the newest schema. Only the
//! parquet footer is parsed, not the data pages.

use bytes::Bytes;
use parquet::arrow::parquet_to_arrow_schema;
use parquet::file::reader::{FileReader, SerializedFileReader};
use snafu::prelude::*;
use tracing::debug;

use crate::error::{
    ArrowConversionSnafu, EmptySampleSnafu, ParquetFooterSnafu, SampleReadSnafu, SchemaError,
};
use crate::storage::{DataObject, ObjectStorage};

use super::TableSchema;

/// Infer the table schema from the footer of a parquet file's bytes.
///
/// Field order is preserved; every field collapses to the text type and the
/// operation tag is injected if absent.
pub fn infer_schema_from_parquet_bytes(key: &str, bytes: &Bytes) -> Result<TableSchema, SchemaError> {
    let reader = SerializedFileReader::new(bytes.clone()).context(ParquetFooterSnafu { key })?;

    let metadata = reader.metadata();

    let arrow_schema = parquet_to_arrow_schema(metadata.file_metadata().schema_descr(), None)
        .context(ArrowConversionSnafu { key })?;

    let mut schema =
        TableSchema::from_field_names(arrow_schema.fields().iter().map(|f| f.name().clone()));
    schema.ensure_operation_tag();

    Ok(schema)
}

/// Sort objects most-recently-modified first.
///
/// The sort is stable, so objects with equal timestamps keep the storage
/// system's native listing order.
pub fn sort_newest_first(objects: &mut [DataObject]) {
    objects.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
}

/// Infer the schema for a table directory from its newest object.
///
/// `objects` must already be sorted newest-first (see [`sort_newest_first`]).
/// Fails with [`SchemaError::EmptySample`] when the directory has no objects.
pub async fn infer_table_schema(
    storage: &dyn ObjectStorage,
    table: &str,
    objects: &[DataObject],
) -> Result<TableSchema, SchemaError> {
    let sample = objects.first().context(EmptySampleSnafu { table })?;

    debug!(target = %table, key = %sample.key, "Inferring schema from sample file");

    let bytes = storage
        .get(&sample.key)
        .await
        .context(SampleReadSnafu { key: &sample.key })?;

    let schema = infer_schema_from_parquet_bytes(&sample.key, &bytes)?;

    debug!(
        target = %table,
        columns = schema.len(),
        "Inferred schema"
    );

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;
    use arrow::array::{Int32Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use chrono::{TimeZone, Utc};
    use parquet::arrow::ArrowWriter;
    use std::sync::Arc;

    fn parquet_bytes_with_fields(fields: Vec<&str>) -> Bytes {
        let schema = Arc::new(Schema::new(
            fields
                .iter()
                .map(|name| Field::new(*name, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        ));

        let columns: Vec<Arc<dyn arrow::array::Array>> = fields
            .iter()
            .map(|_| Arc::new(StringArray::from(vec![Some("x")])) as _)
            .collect();

        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

        let mut buffer = Vec::new();
        {
            let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).unwrap();
            writer.write(&batch).unwrap();
            writer.close().unwrap();
        }

        Bytes::from(buffer)
    }

    #[test]
    fn test_infer_from_bytes_preserves_field_order() {
        let bytes = parquet_bytes_with_fields(vec!["Op", "id", "name"]);
        let schema = infer_schema_from_parquet_bytes("orders/f.parquet", &bytes).unwrap();

        let names: Vec<_> = schema.names().collect();
        assert_eq!(names, vec!["Op", "id", "name"]);
    }

    #[test]
    fn test_infer_injects_operation_tag() {
        let bytes = parquet_bytes_with_fields(vec!["id", "name"]);
        let schema = infer_schema_from_parquet_bytes("orders/f.parquet", &bytes).unwrap();

        let names: Vec<_> = schema.names().collect();
        assert_eq!(names, vec!["Op", "id", "name"]);
    }

    #[test]
    fn test_infer_excludes_reserved_schema_field() {
        let bytes = parquet_bytes_with_fields(vec!["Op", "id", "Schema"]);
        let schema = infer_schema_from_parquet_bytes("orders/f.parquet", &bytes).unwrap();

        let names: Vec<_> = schema.names().collect();
        assert_eq!(names, vec!["Op", "id"]);
    }

    #[test]
    fn test_infer_non_string_fields_collapse_to_text() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int32Array::from(vec![1])),
                Arc::new(StringArray::from(vec![Some("a")])),
            ],
        )
        .unwrap();

        let mut buffer = Vec::new();
        {
            let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).unwrap();
            writer.write(&batch).unwrap();
            writer.close().unwrap();
        }

        let inferred =
            infer_schema_from_parquet_bytes("t/f.parquet", &Bytes::from(buffer)).unwrap();
        assert!(inferred.iter().all(|(_, ty)| ty == ColumnType::Text));
    }

    #[test]
    fn test_infer_invalid_bytes() {
        let bytes = Bytes::from_static(b"not a parquet file");
        let result = infer_schema_from_parquet_bytes("t/f.parquet", &bytes);
        assert!(result.is_err());
    }

    #[test]
    fn test_sort_newest_first_is_stable() {
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();

        let mut objects = vec![
            DataObject {
                key: "t/a.parquet".into(),
                last_modified: t1,
            },
            DataObject {
                key: "t/b.parquet".into(),
                last_modified: t2,
            },
            DataObject {
                key: "t/c.parquet".into(),
                last_modified: t2,
            },
        ];

        sort_newest_first(&mut objects);

        // Newest first; equal timestamps keep native listing order
        assert_eq!(objects[0].key, "t/b.parquet");
        assert_eq!(objects[1].key, "t/c.parquet");
        assert_eq!(objects[2].key, "t/a.parquet");
    }
}
