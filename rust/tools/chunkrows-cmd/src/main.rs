use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod utils;

use commands::CursorArgs;

#[derive(Parser)]
#[command(name = "chunkrows-cmd")]
#[command(about = "Command-line utility for reading Parquet chunk streams row by row")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the first rows of a chunk stream
    Head {
        /// Number of rows to print
        #[arg(short = 'n', long, default_value_t = 10)]
        count: u64,

        #[command(flatten)]
        cursor: CursorArgs,

        /// Parquet files forming the chunk stream, in order
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Read every row of a chunk stream and report throughput
    Consume {
        /// Number of times to read the stream
        #[arg(short, long)]
        iterations: Option<u64>,

        #[command(flatten)]
        cursor: CursorArgs,

        /// Parquet files forming the chunk stream, in order
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Display the column schema of a chunk as JSON
    Inspect {
        /// Parquet file to inspect
        file: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Head {
            count,
            cursor,
            files,
        } => commands::head::run(count, cursor, files),
        Commands::Consume {
            iterations,
            cursor,
            files,
        } => commands::consume::run(iterations, cursor, files),
        Commands::Inspect { file } => commands::inspect::run(file),
    }
}
