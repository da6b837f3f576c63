//! Inspect command implementation

use anyhow::{Context, Result};
use bytes::Bytes;
use chunkrows::{
    chunk::Chunk,
    column::ColumnDescriptor,
    reader::{ChunkFormat, ParquetChunkFormat},
};
use serde::Serialize;

use crate::commands::count_rows;
use crate::utils;

#[derive(Serialize)]
struct InspectSummary {
    file: String,
    size: u64,
    rows: u64,
    columns: Vec<ColumnInfo>,
}

#[derive(Serialize)]
struct ColumnInfo {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    scan_type: Option<String>,
}

impl From<&ColumnDescriptor> for ColumnInfo {
    fn from(column: &ColumnDescriptor) -> Self {
        ColumnInfo {
            name: column.name().to_string(),
            type_name: column.database_type_name(),
            nullable: column.nullable(),
            scan_type: column
                .column_type()
                .scan_type()
                .map(|scan_type| format!("{scan_type:?}")),
        }
    }
}

pub fn run(file: String) -> Result<()> {
    let summary = summarize(&file)?;
    let json = serde_json::to_string_pretty(&summary)
        .with_context(|| "Failed to serialize summary")?;
    println!("{json}");
    Ok(())
}

fn summarize(file: &str) -> Result<InspectSummary> {
    let size = utils::chunk_file_size(file)?;
    let data = std::fs::read(file)
        .map(Bytes::from)
        .with_context(|| format!("Failed to read file: {file}"))?;
    let rows = count_rows(&data)?;
    let mut reader = ParquetChunkFormat
        .open(Chunk::new(data, rows), 1024)
        .with_context(|| format!("Failed to open chunk: {file}"))?;
    let columns = reader.schema().columns().iter().map(ColumnInfo::from).collect();
    reader.close()?;
    Ok(InspectSummary {
        file: file.to_string(),
        size,
        rows,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use chunkrows_testkit::files::ChunkFiles;

    use super::*;

    #[test]
    fn test_summarize() {
        let files = ChunkFiles::sequence(&[12]).unwrap();
        let path = files.paths()[0].to_string_lossy().into_owned();
        let summary = summarize(&path).unwrap();
        assert_eq!(summary.rows, 12);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["columns"][0]["name"], "id");
        assert_eq!(json["columns"][0]["type"], "INT64");
        assert_eq!(json["columns"][0]["nullable"], false);
        assert_eq!(json["columns"][1]["type"], "STRING");
        assert_eq!(json["columns"][1]["scan_type"], "String");
    }
}
