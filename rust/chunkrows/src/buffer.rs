//! Row buffer manager.
//!
//! Keeps one bounded window of decoded rows and refills it on demand, first from
//! the chunk currently being read and, once that chunk is exhausted, from the
//! next chunk of the stream. Every row reported by the engine is surfaced
//! exactly once.

use std::sync::Arc;

use arrow::array::RecordBatch;
use chunkrows_common::{Result, error::Error};

use crate::{
    chunk::{Chunk, ChunkSource},
    column::SchemaRef,
    options::EmptyChunkPolicy,
    reader::{ChunkFormat, ChunkReader},
};

/// Outcome of a [`RowBuffer::refill`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refill {
    /// A new, non-empty window is ready.
    Filled,
    /// The stream holds no further rows.
    EndOfStream,
}

/// Outcome of moving to the next chunk of the stream.
enum Advance {
    Opened,
    Skipped,
    EndOfStream,
}

/// Buffer window over the current chunk, plus the chunk stream it is fed from.
pub struct RowBuffer {
    source: Option<Box<dyn ChunkSource>>,
    format: Arc<dyn ChunkFormat>,
    reader: Option<Box<dyn ChunkReader>>,
    schema: Option<SchemaRef>,
    window: Option<RecordBatch>,
    index: usize,
    prefetch_size: usize,
    empty_chunk_policy: EmptyChunkPolicy,
    rows_consumed: u64,
    chunks_opened: u64,
}

impl RowBuffer {
    /// Creates a buffer over `source`, with no chunk opened yet.
    pub fn new(
        source: Box<dyn ChunkSource>,
        format: Arc<dyn ChunkFormat>,
        prefetch_size: usize,
        empty_chunk_policy: EmptyChunkPolicy,
    ) -> Result<RowBuffer> {
        if prefetch_size == 0 {
            return Err(Error::invalid_arg("prefetch_size", "must be positive"));
        }
        Ok(RowBuffer {
            source: Some(source),
            format,
            reader: None,
            schema: None,
            window: None,
            index: 0,
            prefetch_size,
            empty_chunk_policy,
            rows_consumed: 0,
            chunks_opened: 0,
        })
    }

    /// Pulls the next chunk from the source without checking it.
    pub fn fetch_chunk(&mut self) -> Result<Option<Chunk>> {
        match self.source.as_mut() {
            Some(source) => source.next_chunk(),
            None => Ok(None),
        }
    }

    /// Opens a reader over `chunk`, replacing the current one. The stream schema
    /// is taken from the first reader opened.
    pub fn open_chunk(&mut self, chunk: Chunk) -> Result<()> {
        self.close_reader()?;
        log::trace!(
            "opening chunk of {} rows ({} bytes)",
            chunk.rows_read(),
            chunk.len()
        );
        let reader = self.format.open(chunk, self.prefetch_size)?;
        if self.schema.is_none() {
            self.schema = Some(reader.schema().clone());
        }
        self.reader = Some(reader);
        self.chunks_opened += 1;
        Ok(())
    }

    pub fn schema(&self) -> Option<&SchemaRef> {
        self.schema.as_ref()
    }

    pub fn empty_chunk_policy(&self) -> EmptyChunkPolicy {
        self.empty_chunk_policy
    }

    /// Rows handed out so far.
    pub fn rows_consumed(&self) -> u64 {
        self.rows_consumed
    }

    /// Chunks a reader has been opened over so far.
    pub fn chunks_opened(&self) -> u64 {
        self.chunks_opened
    }

    /// Returns `true` when the current window has no unread rows.
    pub fn needs_refill(&self) -> bool {
        self.window
            .as_ref()
            .is_none_or(|window| self.index >= window.num_rows())
    }

    /// Replaces the exhausted window with the next one.
    ///
    /// Rows are taken from the current chunk while it has any. Once it is
    /// exhausted the next chunk is requested: no chunk, or (under
    /// [`EmptyChunkPolicy::Terminate`]) a chunk with zero rows, ends the stream;
    /// a chunk carrying an error fails the refill with a `Chunk` error.
    /// Otherwise a reader is opened over it and the window is filled from it.
    pub fn refill(&mut self) -> Result<Refill> {
        self.window = None;
        self.index = 0;

        if self.fill_window()? {
            return Ok(Refill::Filled);
        }
        loop {
            match self.advance_chunk()? {
                Advance::EndOfStream => return Ok(Refill::EndOfStream),
                Advance::Skipped => continue,
                Advance::Opened => {}
            }
            if self.fill_window()? {
                return Ok(Refill::Filled);
            }
            if self.empty_chunk_policy == EmptyChunkPolicy::Terminate {
                log::debug!("chunk declared rows but decoded none; ending stream");
                return Ok(Refill::EndOfStream);
            }
        }
    }

    /// Decodes the next row of the window with `decode` and advances past it.
    ///
    /// The position only moves when `decode` succeeds, so a failed row is not
    /// silently skipped.
    pub fn decode_next<'a, T>(
        &'a mut self,
        decode: impl FnOnce(&'a SchemaRef, &'a RecordBatch, usize) -> Result<T>,
    ) -> Result<T> {
        let index = self.index;
        let (Some(schema), Some(window)) = (self.schema.as_ref(), self.window.as_ref()) else {
            return Err(Error::invalid_operation("decode_next without a filled window"));
        };
        if index >= window.num_rows() {
            return Err(Error::invalid_operation("decode_next past the end of the window"));
        }
        let value = decode(schema, window, index)?;
        self.index += 1;
        self.rows_consumed += 1;
        Ok(value)
    }

    /// Releases the reader, the window and the chunk stream, in that order.
    /// Idempotent.
    pub fn close(&mut self) -> Result<()> {
        let reader_res = self.close_reader();
        self.window = None;
        self.index = 0;
        let source_res = match self.source.take() {
            Some(mut source) => source.close(),
            None => Ok(()),
        };
        reader_res.and(source_res)
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    fn fill_window(&mut self) -> Result<bool> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(false);
        };
        match reader.read_rows(self.prefetch_size)? {
            Some(batch) if batch.num_rows() > 0 => {
                self.window = Some(batch);
                self.index = 0;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn advance_chunk(&mut self) -> Result<Advance> {
        self.close_reader()?;
        let Some(chunk) = self.fetch_chunk()? else {
            log::debug!("chunk stream exhausted after {} rows", self.rows_consumed);
            return Ok(Advance::EndOfStream);
        };
        if let Some(message) = chunk.error() {
            return Err(Error::chunk(message));
        }
        if chunk.rows_read() == 0 {
            return match self.empty_chunk_policy {
                EmptyChunkPolicy::Terminate => {
                    log::debug!("empty chunk ends the stream after {} rows", self.rows_consumed);
                    Ok(Advance::EndOfStream)
                }
                EmptyChunkPolicy::Skip => {
                    log::trace!("skipping empty chunk");
                    Ok(Advance::Skipped)
                }
            };
        }
        self.open_chunk(chunk)?;
        Ok(Advance::Opened)
    }

    fn close_reader(&mut self) -> Result<()> {
        match self.reader.take() {
            Some(mut reader) => reader.close(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chunkrows_common::ErrorKind;

    use super::*;
    use crate::{
        chunk::IterChunkSource,
        reader::ParquetChunkFormat,
        tests::chunk_store::{CountingSource, sequence_chunks},
    };

    fn buffer_over(
        chunks: Vec<Chunk>,
        prefetch_size: usize,
        policy: EmptyChunkPolicy,
    ) -> RowBuffer {
        RowBuffer::new(
            Box::new(IterChunkSource::new(chunks)),
            Arc::new(ParquetChunkFormat),
            prefetch_size,
            policy,
        )
        .unwrap()
    }

    fn drain(buffer: &mut RowBuffer) -> Result<Vec<usize>> {
        let mut windows = Vec::new();
        while buffer.refill()? == Refill::Filled {
            let mut rows = 0;
            while !buffer.needs_refill() {
                buffer.decode_next(|_, _, _| Ok(()))?;
                rows += 1;
            }
            windows.push(rows);
        }
        Ok(windows)
    }

    #[test]
    fn test_partial_windows_are_kept() {
        let mut buffer = buffer_over(sequence_chunks(&[5, 3]), 4, EmptyChunkPolicy::Terminate);
        assert_eq!(drain(&mut buffer).unwrap(), vec![4, 1, 3]);
        assert_eq!(buffer.rows_consumed(), 8);
        assert_eq!(buffer.chunks_opened(), 2);
        assert_eq!(buffer.refill().unwrap(), Refill::EndOfStream);
    }

    #[test]
    fn test_empty_chunk_terminates() {
        let mut buffer = buffer_over(sequence_chunks(&[2, 0, 3]), 8, EmptyChunkPolicy::Terminate);
        assert_eq!(drain(&mut buffer).unwrap(), vec![2]);
    }

    #[test]
    fn test_empty_chunk_skipped() {
        let mut buffer = buffer_over(sequence_chunks(&[2, 0, 3, 0]), 8, EmptyChunkPolicy::Skip);
        assert_eq!(drain(&mut buffer).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_chunk_error_propagates() {
        let mut chunks = sequence_chunks(&[2]);
        chunks.push(Chunk::failed("Code: 241. Memory limit exceeded"));
        let mut buffer = buffer_over(chunks, 8, EmptyChunkPolicy::Terminate);
        let err = drain(&mut buffer).unwrap_err();
        match err.kind() {
            ErrorKind::Chunk { message } => assert_eq!(message, "Code: 241. Memory limit exceeded"),
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn test_decode_failure_keeps_position() {
        let mut buffer = buffer_over(sequence_chunks(&[2]), 8, EmptyChunkPolicy::Terminate);
        assert_eq!(buffer.refill().unwrap(), Refill::Filled);
        let err = buffer
            .decode_next(|_, _, _| -> Result<()> { Err(Error::decode("bad")) })
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Decode { .. }));
        assert_eq!(buffer.rows_consumed(), 0);
        let index = buffer.decode_next(|_, _, index| Ok(index)).unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (source, counters) = CountingSource::new(sequence_chunks(&[3]));
        let mut buffer = RowBuffer::new(
            Box::new(source),
            Arc::new(ParquetChunkFormat),
            2,
            EmptyChunkPolicy::Terminate,
        )
        .unwrap();
        assert_eq!(buffer.refill().unwrap(), Refill::Filled);
        buffer.close().unwrap();
        buffer.close().unwrap();
        assert!(buffer.is_closed());
        assert_eq!(counters.closes(), 1);
        assert_eq!(buffer.refill().unwrap(), Refill::EndOfStream);
    }

    #[test]
    fn test_zero_prefetch_rejected() {
        let err = RowBuffer::new(
            Box::new(IterChunkSource::new(Vec::new())),
            Arc::new(ParquetChunkFormat),
            0,
            EmptyChunkPolicy::Terminate,
        )
        .err()
        .unwrap();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }
}
