//! Cursor and connection options.

use std::path::PathBuf;

use chunkrows_common::{Result, error::Error};
use serde::Deserialize;

/// Rows decoded per buffer refill unless configured otherwise.
pub const DEFAULT_PREFETCH_SIZE: usize = 512;

/// How the row buffer treats a chunk that reports zero rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyChunkPolicy {
    /// A zero-row chunk ends the stream, wherever it occurs.
    #[default]
    Terminate,
    /// Zero-row chunks are released and the next chunk is requested; the stream
    /// ends only when the source has no more chunks.
    Skip,
}

/// Options of a streaming row cursor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CursorOptions {
    /// Number of rows decoded into the buffer window per refill. Trades memory
    /// for fewer refills; does not affect the decoded rows.
    pub prefetch_size: usize,
    /// Decode string columns as views into the live buffer window instead of
    /// owned copies. The views are lent by the cursor and cannot outlive the
    /// next `next_row` or `close` call.
    pub zero_copy_strings: bool,
    pub empty_chunk_policy: EmptyChunkPolicy,
}

impl Default for CursorOptions {
    fn default() -> Self {
        CursorOptions {
            prefetch_size: DEFAULT_PREFETCH_SIZE,
            zero_copy_strings: false,
            empty_chunk_policy: EmptyChunkPolicy::Terminate,
        }
    }
}

impl CursorOptions {
    pub fn with_prefetch_size(self, prefetch_size: usize) -> Self {
        Self {
            prefetch_size,
            ..self
        }
    }

    pub fn with_zero_copy_strings(self, zero_copy_strings: bool) -> Self {
        Self {
            zero_copy_strings,
            ..self
        }
    }

    pub fn with_empty_chunk_policy(self, empty_chunk_policy: EmptyChunkPolicy) -> Self {
        Self {
            empty_chunk_policy,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.prefetch_size == 0 {
            return Err(Error::invalid_arg("prefetch_size", "must be positive"));
        }
        Ok(())
    }
}

/// Options parsed from a connection string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Session working directory; a temporary directory is used when absent.
    pub session_path: Option<PathBuf>,
    pub cursor: CursorOptions,
}

const SESSION_KEY: &str = "session";
const BUFFER_SIZE_KEY: &str = "bufferSize";
const UNSAFE_STRING_READER_KEY: &str = "useUnsafeStringReader";
const SKIP_EMPTY_CHUNKS_KEY: &str = "skipEmptyChunks";

impl ConnectOptions {
    /// Parses `key=value` pairs separated by `&` or `;`, e.g.
    /// `session=/var/lib/engine;bufferSize=1024;useUnsafeStringReader=true`.
    ///
    /// Recognized keys are `session`, `bufferSize`, `useUnsafeStringReader` and
    /// `skipEmptyChunks`. Unrecognized keys are ignored.
    pub fn parse(dsn: &str) -> Result<ConnectOptions> {
        let mut options = ConnectOptions::default();
        for segment in dsn.split(';') {
            for (key, value) in url::form_urlencoded::parse(segment.trim().as_bytes()) {
                match &*key {
                    SESSION_KEY => {
                        options.session_path =
                            (!value.is_empty()).then(|| PathBuf::from(value.into_owned()));
                    }
                    BUFFER_SIZE_KEY => {
                        let prefetch_size = value.parse::<usize>().map_err(|_| {
                            Error::invalid_arg(BUFFER_SIZE_KEY, format!("not a count: {value}"))
                        })?;
                        options.cursor.prefetch_size = prefetch_size;
                    }
                    UNSAFE_STRING_READER_KEY => {
                        options.cursor.zero_copy_strings =
                            parse_flag(UNSAFE_STRING_READER_KEY, &value)?;
                    }
                    SKIP_EMPTY_CHUNKS_KEY => {
                        options.cursor.empty_chunk_policy =
                            if parse_flag(SKIP_EMPTY_CHUNKS_KEY, &value)? {
                                EmptyChunkPolicy::Skip
                            } else {
                                EmptyChunkPolicy::Terminate
                            };
                    }
                    other => log::debug!("ignoring connection option '{other}'"),
                }
            }
        }
        options.cursor.validate()?;
        Ok(options)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::invalid_arg(key, format!("not a boolean: {value}"))),
    }
}
