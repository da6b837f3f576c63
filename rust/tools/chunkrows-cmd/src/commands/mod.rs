//! Command implementations for chunkrows-cmd

use std::{collections::VecDeque, path::PathBuf, time::Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use chunkrows::{
    Error,
    chunk::{Chunk, ChunkSource},
    options::{CursorOptions, EmptyChunkPolicy},
};
use clap::Args;
use parquet::file::reader::{FileReader, SerializedFileReader};

use crate::utils;

pub mod consume;
pub mod head;
pub mod inspect;

/// Cursor configuration shared by the commands that read rows.
#[derive(Args, Debug, Default)]
pub struct CursorArgs {
    /// Rows decoded per buffer refill
    #[arg(long)]
    pub prefetch_size: Option<usize>,

    /// Decode strings as views into the buffer window instead of copies
    #[arg(long)]
    pub zero_copy_strings: bool,

    /// Skip zero-row chunks instead of ending the stream at the first one
    #[arg(long)]
    pub skip_empty_chunks: bool,

    /// Path to a JSON file with cursor options; flags take precedence
    #[arg(long)]
    pub options: Option<String>,
}

impl CursorArgs {
    pub fn to_options(&self) -> Result<CursorOptions> {
        let mut options = match &self.options {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read options file: {path}"))?;
                serde_json::from_str::<CursorOptions>(&content)
                    .with_context(|| format!("Failed to parse options file: {path}"))?
            }
            None => CursorOptions::default(),
        };
        if let Some(prefetch_size) = self.prefetch_size {
            options.prefetch_size = prefetch_size;
        }
        if self.zero_copy_strings {
            options.zero_copy_strings = true;
        }
        if self.skip_empty_chunks {
            options.empty_chunk_policy = EmptyChunkPolicy::Skip;
        }
        options.validate()?;
        Ok(options)
    }
}

/// Chunk stream read from a list of Parquet files, one chunk per file.
pub struct FileChunkSource {
    files: VecDeque<(PathBuf, u64)>,
}

impl FileChunkSource {
    pub fn new(files: Vec<String>) -> Result<FileChunkSource> {
        let files = files
            .into_iter()
            .map(|file| -> Result<(PathBuf, u64)> {
                let size = utils::chunk_file_size(&file)?;
                Ok((PathBuf::from(file), size))
            })
            .collect::<Result<_>>()?;
        Ok(FileChunkSource { files })
    }

    /// Total size of the files not yet read, as checked when the source was
    /// created.
    pub fn remaining_size(&self) -> u64 {
        self.files.iter().map(|(_, size)| size).sum()
    }
}

impl ChunkSource for FileChunkSource {
    fn next_chunk(&mut self) -> chunkrows::Result<Option<Chunk>> {
        let Some((path, _)) = self.files.pop_front() else {
            return Ok(None);
        };
        let start = Instant::now();
        let data = std::fs::read(&path)
            .map(Bytes::from)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        let rows = count_rows(&data)?;
        let bytes_read = data.len() as u64;
        Ok(Some(
            Chunk::new(data, rows).with_stats(bytes_read, start.elapsed()),
        ))
    }

    fn close(&mut self) -> chunkrows::Result<()> {
        self.files.clear();
        Ok(())
    }
}

/// Row count recorded in the Parquet footer.
pub fn count_rows(data: &Bytes) -> chunkrows::Result<u64> {
    let reader = SerializedFileReader::new(data.clone())
        .map_err(|e| Error::parquet("failed to read chunk footer", e))?;
    let rows = reader.metadata().file_metadata().num_rows();
    Ok(u64::try_from(rows).unwrap_or(0))
}
