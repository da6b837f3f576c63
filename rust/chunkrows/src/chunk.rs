//! Result chunks and the chunk source contract.
//!
//! A query engine streams its result as an ordered, finite sequence of
//! [`Chunk`]s. Each chunk carries an opaque columnar buffer, the number of rows
//! the engine reports for it and, when execution failed mid-stream, a diagnostic
//! message instead of data.

use std::time::Duration;

use bytes::Bytes;
use chunkrows_common::Result;

/// One unit of a streamed query result.
///
/// The payload is reference-counted ([`Bytes`]), so handing a chunk to a
/// [`ChunkReader`](crate::reader::ChunkReader) does not copy it. The backing
/// memory is released when the last reader over it is dropped.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    data: Bytes,
    rows_read: u64,
    bytes_read: u64,
    elapsed: Duration,
    error: Option<String>,
}

impl Chunk {
    /// Creates a chunk holding `rows_read` rows encoded in `data`.
    pub fn new(data: impl Into<Bytes>, rows_read: u64) -> Chunk {
        Chunk {
            data: data.into(),
            rows_read,
            ..Default::default()
        }
    }

    /// Creates a chunk that carries an engine-side error instead of data.
    pub fn failed(message: impl Into<String>) -> Chunk {
        Chunk {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Attaches the engine's execution statistics for this chunk.
    pub fn with_stats(self, bytes_read: u64, elapsed: Duration) -> Chunk {
        Chunk {
            bytes_read,
            elapsed,
            ..self
        }
    }

    /// Number of rows the engine reports for this chunk. Zero marks the end of
    /// the stream under the default empty-chunk policy.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// The encoded chunk payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes scanned by the engine to produce this chunk.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Engine-side time spent producing this chunk.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Engine diagnostic, if the chunk reports a failure.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Consumes the chunk, returning its payload.
    pub fn into_data(self) -> Bytes {
        self.data
    }
}

/// Produces the chunks of one streamed query result, in order.
///
/// `next_chunk` returns `Ok(None)` once the stream is exhausted; transport
/// failures surface as `Err`, while engine-side query failures are reported
/// through [`Chunk::error`].
pub trait ChunkSource {
    fn next_chunk(&mut self) -> Result<Option<Chunk>>;

    /// Releases the stream. Must tolerate being called more than once.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        (**self).next_chunk()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Adapts any iterator of chunks to the [`ChunkSource`] contract.
pub struct IterChunkSource<I> {
    chunks: Option<I>,
}

impl<I> IterChunkSource<I>
where
    I: Iterator<Item = Chunk>,
{
    pub fn new(chunks: impl IntoIterator<IntoIter = I>) -> IterChunkSource<I> {
        IterChunkSource {
            chunks: Some(chunks.into_iter()),
        }
    }
}

impl<I> ChunkSource for IterChunkSource<I>
where
    I: Iterator<Item = Chunk>,
{
    fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        Ok(self.chunks.as_mut().and_then(Iterator::next))
    }

    fn close(&mut self) -> Result<()> {
        self.chunks = None;
        Ok(())
    }
}
