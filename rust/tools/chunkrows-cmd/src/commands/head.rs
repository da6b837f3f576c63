use anyhow::{Context, Result};
use chunkrows::cursor::{Row, RowCursor, StreamingRowsBuilder};
use itertools::Itertools;

use crate::commands::{CursorArgs, FileChunkSource};

pub fn run(count: u64, cursor_args: CursorArgs, files: Vec<String>) -> Result<()> {
    let options = cursor_args.to_options()?;
    let source = FileChunkSource::new(files)?;
    let mut cursor = StreamingRowsBuilder::new(source)
        .with_options(options)
        .build()
        .with_context(|| "Failed to open chunk stream")?;

    println!("{}", cursor.columns().join("\t"));

    let mut printed = 0;
    while printed < count {
        let Some(row) = cursor.next_row().with_context(|| "Failed to read row")? else {
            break;
        };
        println!("{}", format_row(&row));
        printed += 1;
    }

    if printed == 0 {
        println!("No rows found in chunk stream.");
    }

    cursor.close()?;
    Ok(())
}

fn format_row(row: &Row<'_>) -> String {
    row.values().iter().join("\t")
}
