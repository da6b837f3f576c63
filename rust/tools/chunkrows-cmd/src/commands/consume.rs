//! Consume command implementation

use anyhow::{Context, Result};
use chunkrows::cursor::StreamingRowsBuilder;
use std::time::Instant;

use crate::commands::{CursorArgs, FileChunkSource};
use crate::utils;

/// Run the consume command
pub fn run(iterations: Option<u64>, cursor_args: CursorArgs, files: Vec<String>) -> Result<()> {
    let iterations = iterations.unwrap_or(1);
    for _ in 0..iterations {
        run_single(&cursor_args, files.clone())?;
    }
    Ok(())
}

pub fn run_single(cursor_args: &CursorArgs, files: Vec<String>) -> Result<()> {
    println!("Consuming {} chunk file(s)", files.len());

    let options = cursor_args.to_options()?;
    let source = FileChunkSource::new(files)?;
    let total_data_size = source.remaining_size();

    let start_time = Instant::now();

    let mut cursor = StreamingRowsBuilder::new(source)
        .with_options(options)
        .build()
        .with_context(|| "Failed to open chunk stream")?;

    let mut null_count = 0u64;
    while let Some(row) = cursor.next_row().with_context(|| "Failed to read row")? {
        null_count += row.values().iter().filter(|value| value.is_null()).count() as u64;
    }

    let elapsed = start_time.elapsed();
    let total_records = cursor.rows_consumed();
    let chunk_count = cursor.chunks_consumed();
    cursor.close()?;

    println!("Consumption completed:");
    println!("  Total time: {:.3} seconds", elapsed.as_secs_f64());
    println!("  Total chunks: {chunk_count}");
    println!("  Total records: {total_records}");
    println!("  Null values: {null_count}");
    println!("  Total data size: {}", utils::format_size(total_data_size));

    if elapsed.as_millis() > 0 {
        let throughput_mb_per_sec =
            (total_data_size as f64) / (1024.0 * 1024.0) / elapsed.as_secs_f64();
        println!("  Throughput: {throughput_mb_per_sec:.2} MB/s");

        let records_per_sec = (total_records as f64) / elapsed.as_secs_f64();
        println!("  Records/sec: {records_per_sec:.0}");
    }

    Ok(())
}
