//! Row cursor over a chunk stream.
//!
//! [`StreamingRows`] is a forward-only, pull-based cursor: each
//! [`next_row`](StreamingRows::next_row) call decodes one row of the current
//! buffer window, refilling the window from the chunk stream when it runs dry.
//! End of data is `Ok(None)` and is never reported as an error.

use std::{iter::FusedIterator, sync::Arc};

use arrow::array::RecordBatch;
use chunkrows_common::{Result, error::Error, try_or_ret_some_err, verify_data};

use crate::{
    buffer::{Refill, RowBuffer},
    chunk::ChunkSource,
    column::{ChunkSchema, ColumnDescriptor, ScanType, SchemaRef},
    options::{CursorOptions, EmptyChunkPolicy},
    reader::{ChunkFormat, ParquetChunkFormat},
    value::{Value, convert_value},
};

/// Row-access contract of a database cursor.
pub trait RowCursor {
    /// Schema of the result, once derived from the first chunk.
    fn schema(&self) -> Option<&SchemaRef>;

    /// Decodes the next row, or returns `Ok(None)` at the end of data.
    fn next_row(&mut self) -> Result<Option<Row<'_>>>;

    /// Releases all resources held by the cursor. Idempotent.
    fn close(&mut self) -> Result<()>;

    /// Column names in declared order. Empty until a schema has been derived.
    fn columns(&self) -> Vec<&str> {
        self.schema()
            .map(|schema| schema.names().collect())
            .unwrap_or_default()
    }

    /// Physical type tag of the column, e.g. `INT32` or
    /// `TIMESTAMP(isAdjustedToUTC=true,unit=MILLIS)`.
    fn column_database_type_name(&self, index: usize) -> Result<String> {
        Ok(column_at(self.schema(), index)?.database_type_name())
    }

    fn column_nullable(&self, index: usize) -> Result<bool> {
        Ok(column_at(self.schema(), index)?.nullable())
    }

    /// Precision and scale of the column. The chunk format does not carry
    /// them, so this is always `None`.
    fn column_precision_scale(&self, index: usize) -> Result<Option<(i64, i64)>> {
        column_at(self.schema(), index)?;
        Ok(None)
    }

    /// Host type produced for the column's values, or `None` when the column
    /// type cannot be converted.
    fn column_scan_type(&self, index: usize) -> Result<Option<ScanType>> {
        Ok(column_at(self.schema(), index)?.column_type().scan_type())
    }
}

fn column_at(schema: Option<&SchemaRef>, index: usize) -> Result<&ColumnDescriptor> {
    let schema = schema.ok_or_else(|| Error::invalid_operation("column metadata before schema"))?;
    schema.column(index).ok_or_else(|| {
        Error::invalid_arg(
            "index",
            format!("column {index} out of range for {} columns", schema.len()),
        )
    })
}

/// One decoded row lent by a cursor.
///
/// With zero-copy strings enabled, string values borrow the cursor's buffer
/// window, so the row cannot be kept past the next `next_row` or `close`.
/// [`Row::into_owned`] detaches it.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<'a> {
    values: Vec<Value<'a>>,
}

impl<'a> Row<'a> {
    pub fn values(&self) -> &[Value<'a>] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value<'a>> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value<'a>> {
        self.values
    }

    pub fn into_owned(self) -> Row<'static> {
        Row {
            values: self.values.into_iter().map(Value::into_owned).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// Opened; no row requested yet.
    Fresh,
    /// Serving rows.
    Active,
    /// End of data reached.
    Exhausted,
    /// A read failed; no further rows are served.
    Failed,
    Closed,
}

/// Streaming row cursor over a [`ChunkSource`].
///
/// Created with [`StreamingRowsBuilder`]. The first chunk is fetched when the
/// cursor is built; every later chunk is fetched only once the previous one is
/// exhausted.
pub struct StreamingRows {
    buffer: RowBuffer,
    state: CursorState,
    first_chunk_rows: u64,
    zero_copy_strings: bool,
}

impl StreamingRows {
    /// Decodes the next row.
    ///
    /// Returns `Ok(None)` at the end of data, and keeps doing so on later
    /// calls. Fails with a `Chunk` error when the stream reports an engine
    /// fault, `Decode` for a malformed record and `TypeConversion` for a
    /// column without a conversion rule. None of these are retried: the
    /// cursor is failed afterwards and later calls return `InvalidOperation`.
    /// A chunk error also releases the chunk stream at once.
    pub fn next_row(&mut self) -> Result<Option<Row<'_>>> {
        match self.state {
            CursorState::Closed => return Err(Error::invalid_operation("next_row after close")),
            CursorState::Failed => {
                return Err(Error::invalid_operation("next_row after a failed read"));
            }
            CursorState::Exhausted => return Ok(None),
            CursorState::Fresh => {
                if self.first_chunk_rows == 0
                    && self.buffer.empty_chunk_policy() == EmptyChunkPolicy::Terminate
                {
                    log::debug!("first chunk is empty; no rows to read");
                    self.state = CursorState::Exhausted;
                    return Ok(None);
                }
                self.state = CursorState::Active;
            }
            CursorState::Active => {}
        }

        // Reset to `Active` only once the row has been decoded.
        self.state = CursorState::Failed;
        if self.buffer.needs_refill() {
            match self.buffer.refill() {
                Ok(Refill::Filled) => {}
                Ok(Refill::EndOfStream) => {
                    log::debug!(
                        "end of data after {} rows in {} chunks",
                        self.buffer.rows_consumed(),
                        self.buffer.chunks_opened()
                    );
                    self.state = CursorState::Exhausted;
                    return Ok(None);
                }
                Err(e) => {
                    self.release_stream();
                    return Err(e);
                }
            }
        }

        let zero_copy_strings = self.zero_copy_strings;
        let values = self.buffer.decode_next(|schema, window, index| {
            decode_row(schema, window, index, zero_copy_strings)
        })?;
        self.state = CursorState::Active;
        Ok(Some(Row { values }))
    }

    /// Decodes the next row into `slot` as owned values, replacing its
    /// contents. Returns `false` at the end of data, leaving `slot` untouched.
    pub fn next_into(&mut self, slot: &mut Vec<Value<'static>>) -> Result<bool> {
        let Some(row) = self.next_row()? else {
            return Ok(false);
        };
        slot.clear();
        slot.extend(row.into_values().into_iter().map(Value::into_owned));
        Ok(true)
    }

    /// Turns the cursor into an iterator of owned rows.
    pub fn into_owned_rows(self) -> OwnedRows {
        OwnedRows {
            cursor: self,
            done: false,
        }
    }

    pub fn schema(&self) -> Option<&SchemaRef> {
        self.buffer.schema()
    }

    /// Number of rows returned so far.
    pub fn rows_consumed(&self) -> u64 {
        self.buffer.rows_consumed()
    }

    /// Number of chunks opened so far.
    pub fn chunks_consumed(&self) -> u64 {
        self.buffer.chunks_opened()
    }

    pub fn zero_copy_strings(&self) -> bool {
        self.zero_copy_strings
    }

    /// Releases the chunk reader, the buffer window and the chunk stream.
    /// Safe to call after any error and more than once.
    pub fn close(&mut self) -> Result<()> {
        if self.state == CursorState::Closed {
            return Ok(());
        }
        self.state = CursorState::Closed;
        log::debug!("closing cursor after {} rows", self.buffer.rows_consumed());
        self.buffer.close()
    }

    fn release_stream(&mut self) {
        if let Err(e) = self.buffer.close() {
            log::debug!("error releasing chunk stream after a failed read: {e}");
        }
    }
}

impl RowCursor for StreamingRows {
    fn schema(&self) -> Option<&SchemaRef> {
        StreamingRows::schema(self)
    }

    fn next_row(&mut self) -> Result<Option<Row<'_>>> {
        StreamingRows::next_row(self)
    }

    fn close(&mut self) -> Result<()> {
        StreamingRows::close(self)
    }
}

impl Drop for StreamingRows {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::debug!("error closing cursor on drop: {e}");
        }
    }
}

fn decode_row<'a>(
    schema: &ChunkSchema,
    window: &'a RecordBatch,
    index: usize,
    zero_copy_strings: bool,
) -> Result<Vec<Value<'a>>> {
    let width = window.num_columns();
    verify_data!(record, width != 0);
    verify_data!(record, width == schema.len());
    schema
        .columns()
        .iter()
        .zip(window.columns())
        .map(|(column, array)| convert_value(column, array, index, zero_copy_strings))
        .collect()
}

/// Iterator of owned rows, see [`StreamingRows::into_owned_rows`].
///
/// Ends after the first error.
pub struct OwnedRows {
    cursor: StreamingRows,
    done: bool,
}

impl OwnedRows {
    pub fn cursor(&self) -> &StreamingRows {
        &self.cursor
    }

    pub fn into_cursor(self) -> StreamingRows {
        self.cursor
    }
}

impl Iterator for OwnedRows {
    type Item = Result<Vec<Value<'static>>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let row = self.cursor.next_row();
        self.done = !matches!(row, Ok(Some(_)));
        let row = try_or_ret_some_err!(row)?;
        Some(Ok(row.into_owned().into_values()))
    }
}

impl FusedIterator for OwnedRows {}

/// Builds a [`StreamingRows`] cursor over a chunk source.
pub struct StreamingRowsBuilder {
    source: Box<dyn ChunkSource>,
    options: CursorOptions,
    format: Arc<dyn ChunkFormat>,
}

impl StreamingRowsBuilder {
    pub fn new(source: impl ChunkSource + 'static) -> StreamingRowsBuilder {
        StreamingRowsBuilder {
            source: Box::new(source),
            options: CursorOptions::default(),
            format: Arc::new(ParquetChunkFormat),
        }
    }

    pub fn with_options(self, options: CursorOptions) -> Self {
        Self { options, ..self }
    }

    pub fn with_prefetch_size(self, prefetch_size: usize) -> Self {
        let options = self.options.clone().with_prefetch_size(prefetch_size);
        Self { options, ..self }
    }

    /// Enables borrowed string values, see [`CursorOptions::zero_copy_strings`].
    pub fn with_zero_copy_strings(self, zero_copy_strings: bool) -> Self {
        let options = self.options.clone().with_zero_copy_strings(zero_copy_strings);
        Self { options, ..self }
    }

    pub fn with_empty_chunk_policy(self, empty_chunk_policy: EmptyChunkPolicy) -> Self {
        let options = self.options.clone().with_empty_chunk_policy(empty_chunk_policy);
        Self { options, ..self }
    }

    /// Replaces the chunk encoding, Parquet by default.
    pub fn with_chunk_format(self, format: Arc<dyn ChunkFormat>) -> Self {
        Self { format, ..self }
    }

    /// Fetches the first chunk and opens the cursor over it.
    ///
    /// The schema is derived from the first chunk here, unless the chunk is
    /// empty and carries no payload at all. On failure the chunk source is
    /// closed before the error is returned.
    pub fn build(self) -> Result<StreamingRows> {
        self.options.validate()?;
        let mut buffer = RowBuffer::new(
            self.source,
            self.format,
            self.options.prefetch_size,
            self.options.empty_chunk_policy,
        )?;

        let first_chunk_rows = match open_first_chunk(&mut buffer) {
            Ok(rows) => rows,
            Err(e) => {
                if let Err(close_err) = buffer.close() {
                    log::debug!("error closing chunk stream after a failed open: {close_err}");
                }
                return Err(e);
            }
        };

        Ok(StreamingRows {
            buffer,
            state: CursorState::Fresh,
            first_chunk_rows,
            zero_copy_strings: self.options.zero_copy_strings,
        })
    }
}

/// Fetches the first chunk and opens a reader over it, returning its declared
/// row count.
fn open_first_chunk(buffer: &mut RowBuffer) -> Result<u64> {
    let Some(chunk) = buffer.fetch_chunk()? else {
        return Ok(0);
    };
    if let Some(message) = chunk.error() {
        return Err(Error::chunk(message));
    }
    let rows = chunk.rows_read();
    log::debug!(
        "first chunk: {rows} rows, {} bytes, {:?}",
        chunk.bytes_read(),
        chunk.elapsed()
    );
    if rows > 0 || !chunk.is_empty() {
        buffer.open_chunk(chunk)?;
    }
    Ok(rows)
}
