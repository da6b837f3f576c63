//! Data generation utilities for testing.
//!
//! Record batches follow a fixed "sequence" schema whose values are derived
//! from a running row id, so a stream split into chunks of any sizes can be
//! checked against the ids it should contain.

use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch, StringArray},
    datatypes::{DataType, Field, Schema, SchemaRef},
};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

/// Schema of the sequence batches:
/// `id` (non-null Int64), `name` (Utf8), `score` (Float64), `flag` (Boolean).
pub fn sequence_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
        Field::new("score", DataType::Float64, true),
        Field::new("flag", DataType::Boolean, true),
    ]))
}

/// Name value of row `id`; every seventh name is null.
pub fn sequence_name(id: i64) -> Option<String> {
    (id % 7 != 6).then(|| format!("name_{id}"))
}

/// Generates `count` sequence rows with ids `start..start + count`.
pub fn generate_sequence_batch(start: usize, count: usize) -> RecordBatch {
    let ids = (start..start + count).map(|id| id as i64).collect::<Vec<_>>();
    let names = ids.iter().map(|&id| sequence_name(id)).collect::<StringArray>();
    let scores = ids
        .iter()
        .map(|&id| Some(id as f64 * 0.5))
        .collect::<Float64Array>();
    let flags = ids
        .iter()
        .map(|&id| Some(id % 2 == 0))
        .collect::<BooleanArray>();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(ids)),
        Arc::new(names),
        Arc::new(scores),
        Arc::new(flags),
    ];
    RecordBatch::try_new(sequence_schema(), columns).expect("sequence batch")
}

/// Wraps a single array into a record batch with one column.
pub fn single_column_batch(name: &str, array: ArrayRef, nullable: bool) -> RecordBatch {
    let schema = Schema::new(vec![Field::new(name, array.data_type().clone(), nullable)]);
    RecordBatch::try_new(Arc::new(schema), vec![array]).expect("single column batch")
}

/// Encodes `batches` as one Parquet file. `batches` must not be empty and
/// must share a schema.
pub fn write_parquet(batches: &[RecordBatch]) -> anyhow::Result<Vec<u8>> {
    let schema = batches
        .first()
        .ok_or_else(|| anyhow::anyhow!("no batches to write"))?
        .schema();
    write_parquet_with_schema(schema, batches, None)
}

/// Encodes `batches` as one Parquet file with the given schema, optionally
/// capping the number of rows per row group.
pub fn write_parquet_with_schema(
    schema: SchemaRef,
    batches: &[RecordBatch],
    max_row_group_size: Option<usize>,
) -> anyhow::Result<Vec<u8>> {
    let props = max_row_group_size.map(|size| {
        WriterProperties::builder()
            .set_max_row_group_size(size)
            .build()
    });
    let mut writer = ArrowWriter::try_new(Vec::new(), schema, props)?;
    for batch in batches {
        writer.write(batch)?;
    }
    Ok(writer.into_inner()?)
}

/// Encodes a sequence stream split into chunks of the given row counts.
///
/// Returns one `(payload, rows)` pair per chunk; ids run on across chunks, and
/// a zero-row chunk is still a valid Parquet file carrying the schema.
pub fn sequence_chunk_payloads(chunk_rows: &[usize]) -> anyhow::Result<Vec<(Vec<u8>, u64)>> {
    let mut start = 0;
    let mut payloads = Vec::with_capacity(chunk_rows.len());
    for &rows in chunk_rows {
        let batch = generate_sequence_batch(start, rows);
        let payload = write_parquet_with_schema(sequence_schema(), &[batch], Some(1000))?;
        payloads.push((payload, rows as u64));
        start += rows;
    }
    Ok(payloads)
}
