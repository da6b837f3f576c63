//! Parquet chunk files on disk, for tools that read chunk streams from files.

use std::path::PathBuf;

use crate::data_gen::sequence_chunk_payloads;

/// A temporary directory holding one Parquet file per chunk of a sequence
/// stream. The directory is removed on drop.
pub struct ChunkFiles {
    dir: tempfile::TempDir,
    paths: Vec<PathBuf>,
}

impl ChunkFiles {
    /// Writes `chunk_NNN.parquet` files with the given row counts.
    pub fn sequence(chunk_rows: &[usize]) -> anyhow::Result<ChunkFiles> {
        let dir = tempfile::tempdir()?;
        let mut paths = Vec::with_capacity(chunk_rows.len());
        for (i, (payload, _)) in sequence_chunk_payloads(chunk_rows)?.into_iter().enumerate() {
            let path = dir.path().join(format!("chunk_{i:03}.parquet"));
            std::fs::write(&path, payload)?;
            paths.push(path);
        }
        Ok(ChunkFiles { dir, paths })
    }

    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}
