//! Chunk Rows
//!
//! A forward-only row cursor over a query engine's streamed result, where the
//! stream is a sequence of self-describing columnar chunks (Parquet). Chunks
//! are decoded lazily, a bounded window of rows at a time, and each column's
//! physical encoding is converted into a host [`value::Value`] on demand.
//!
//! The main entry points are [`cursor::StreamingRowsBuilder`] (wrap any
//! [`chunk::ChunkSource`]) and [`session::Session`] (an explicit engine
//! session handle that opens streaming queries).

pub mod buffer;
pub mod chunk;
pub mod column;
pub mod cursor;
pub mod options;
pub mod reader;
pub mod session;
pub mod value;

#[cfg(test)]
mod tests;

pub use chunkrows_common::{Error, ErrorKind, Result};
