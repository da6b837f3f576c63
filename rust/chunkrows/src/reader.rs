//! Columnar chunk readers.
//!
//! A [`ChunkReader`] parses one chunk's payload and hands out its rows as
//! bounded record batches. [`ChunkFormat`] is the factory the row buffer uses
//! to open a reader over each chunk of the stream; [`ParquetChunkFormat`] is
//! the implementation for Parquet-encoded chunks.

use arrow::array::RecordBatch;
use chunkrows_common::{Result, error::Error, verify_arg};
use parquet::arrow::arrow_reader::{
    ArrowReaderOptions, ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder,
};

use crate::{
    chunk::Chunk,
    column::{ChunkSchema, SchemaRef},
};

/// Reader over the rows of a single chunk.
pub trait ChunkReader {
    /// Schema of the chunk.
    fn schema(&self) -> &SchemaRef;

    /// Reads up to `max_rows` records.
    ///
    /// Returns `Ok(None)` once the chunk is exhausted. A returned batch holds at
    /// least one and at most `max_rows` rows; fewer rows than requested does not
    /// imply exhaustion.
    fn read_rows(&mut self, max_rows: usize) -> Result<Option<RecordBatch>>;

    /// Releases the chunk. Subsequent reads report exhaustion.
    fn close(&mut self) -> Result<()>;
}

/// Opens chunk readers for one columnar encoding.
pub trait ChunkFormat: Send + Sync {
    /// Opens a reader taking ownership of `chunk`. `batch_size` is the number of
    /// rows the caller intends to request per [`ChunkReader::read_rows`] call.
    fn open(&self, chunk: Chunk, batch_size: usize) -> Result<Box<dyn ChunkReader>>;
}

/// Chunks encoded as self-contained Parquet files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetChunkFormat;

impl ChunkFormat for ParquetChunkFormat {
    fn open(&self, chunk: Chunk, batch_size: usize) -> Result<Box<dyn ChunkReader>> {
        Ok(Box::new(ParquetChunkReader::try_new(chunk, batch_size)?))
    }
}

/// Reads the rows of a Parquet-encoded chunk.
///
/// The chunk payload is shared with the decoder without copying. Column types
/// are resolved from the Parquet schema itself; any embedded Arrow schema hint
/// is ignored so the decoded layout depends on the physical type tags only.
pub struct ParquetChunkReader {
    schema: SchemaRef,
    batches: Option<ParquetRecordBatchReader>,
    pending: Option<RecordBatch>,
    rows_read: u64,
}

impl ParquetChunkReader {
    pub fn try_new(chunk: Chunk, batch_size: usize) -> Result<ParquetChunkReader> {
        verify_arg!(batch_size, batch_size != 0);
        let options = ArrowReaderOptions::new().with_skip_arrow_metadata(true);
        let builder = ParquetRecordBatchReaderBuilder::try_new_with_options(
            chunk.into_data(),
            options,
        )
        .map_err(|e| Error::parquet("failed to open chunk", e))?;

        let schema = SchemaRef::new(ChunkSchema::from_parquet(builder.parquet_schema()));
        let batches = builder
            .with_batch_size(batch_size)
            .build()
            .map_err(|e| Error::parquet("failed to build chunk reader", e))?;

        Ok(ParquetChunkReader {
            schema,
            batches: Some(batches),
            pending: None,
            rows_read: 0,
        })
    }

    /// Total number of rows handed out so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        if let Some(batch) = self.pending.take() {
            return Ok(Some(batch));
        }
        let Some(batches) = self.batches.as_mut() else {
            return Ok(None);
        };
        loop {
            match batches.next() {
                Some(Ok(batch)) if batch.num_rows() == 0 => continue,
                Some(Ok(batch)) => return Ok(Some(batch)),
                Some(Err(e)) => return Err(Error::arrow("failed to decode chunk rows", e)),
                None => return Ok(None),
            }
        }
    }
}

impl ChunkReader for ParquetChunkReader {
    fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    fn read_rows(&mut self, max_rows: usize) -> Result<Option<RecordBatch>> {
        verify_arg!(max_rows, max_rows != 0);
        let Some(batch) = self.next_batch()? else {
            return Ok(None);
        };
        let batch = if batch.num_rows() > max_rows {
            self.pending = Some(batch.slice(max_rows, batch.num_rows() - max_rows));
            batch.slice(0, max_rows)
        } else {
            batch
        };
        self.rows_read += batch.num_rows() as u64;
        Ok(Some(batch))
    }

    fn close(&mut self) -> Result<()> {
        self.pending = None;
        self.batches = None;
        Ok(())
    }
}
