//! Chunk file checks and size formatting shared by the commands.

use anyhow::{Context, Result};

/// Checks that `path` names a regular file and returns its size in bytes.
pub fn chunk_file_size(path: &str) -> Result<u64> {
    let metadata =
        std::fs::metadata(path).with_context(|| format!("Cannot access chunk file: {path}"))?;
    if !metadata.is_file() {
        anyhow::bail!("Chunk path is not a file: {path}");
    }
    Ok(metadata.len())
}

/// Formats a byte count with a binary unit, e.g. `1.50 KB`.
pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if size < 1024 {
        return format!("{size} B");
    }
    let mut value = size as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.2} {unit}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 << 40), "3.00 TB");
    }

    #[test]
    fn test_chunk_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("chunk.parquet");
        assert!(chunk_file_size(file.to_str().unwrap()).is_err());
        std::fs::write(&file, b"PAR1").unwrap();
        assert_eq!(chunk_file_size(file.to_str().unwrap()).unwrap(), 4);
        assert!(chunk_file_size(dir.path().to_str().unwrap()).is_err());
    }
}
