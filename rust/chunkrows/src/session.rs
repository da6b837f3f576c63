//! Engine session handle.
//!
//! A [`Session`] owns one engine connection and the working directory the
//! engine keeps its state in. Sessions are ordinary values: open as many as
//! needed, and close each one (or drop it) to release the connection.

use std::path::{Path, PathBuf};

use chunkrows_common::{Result, error::Error};
use tempfile::TempDir;

use crate::{
    chunk::{Chunk, ChunkSource},
    cursor::{StreamingRows, StreamingRowsBuilder},
    options::{ConnectOptions, CursorOptions},
};

/// Output format used by [`Session::query`] and [`Session::query_stream`].
pub const DEFAULT_OUTPUT_FORMAT: &str = "CSV";

/// Output format requested by [`Session::query_rows`].
pub const STREAMING_FORMAT: &str = "Parquet";

/// Prefix of the temporary working directories created for sessions.
pub const TEMP_DIR_PREFIX: &str = "chunkrows_";

/// An open connection to a query engine.
pub trait Connection {
    /// Chunk stream of a streaming query.
    type Stream: ChunkSource + 'static;

    /// Runs `sql` and returns the whole result, encoded in `format`, as a
    /// single chunk.
    fn query(&mut self, sql: &str, format: &str) -> Result<Chunk>;

    /// Runs `sql` and returns its result as a stream of chunks encoded in
    /// `format`.
    fn query_stream(&mut self, sql: &str, format: &str) -> Result<Self::Stream>;

    fn close(&mut self) -> Result<()>;
}

/// Opens engine connections.
pub trait Connector {
    type Connection: Connection;

    /// Connects to the engine; `conn_str` is the session working directory.
    fn connect(&self, conn_str: &str) -> Result<Self::Connection>;
}

pub struct Session<C: Connection> {
    conn: Option<C>,
    conn_str: String,
    path: PathBuf,
    temp_dir: Option<TempDir>,
    cursor_options: CursorOptions,
}

impl<C: Connection> Session<C> {
    /// Opens a session. Without `options.session_path` a temporary working
    /// directory is created and removed again when the session is closed.
    pub fn open<K>(connector: &K, options: ConnectOptions) -> Result<Session<C>>
    where
        K: Connector<Connection = C>,
    {
        options.cursor.validate()?;
        let (path, temp_dir) = match options.session_path {
            Some(path) => (path, None),
            None => {
                let temp_dir = tempfile::Builder::new()
                    .prefix(TEMP_DIR_PREFIX)
                    .tempdir()
                    .map_err(|e| Error::io("failed to create session directory", e))?;
                (temp_dir.path().to_path_buf(), Some(temp_dir))
            }
        };
        let conn_str = path.to_string_lossy().into_owned();
        let conn = connector.connect(&conn_str)?;
        log::debug!(
            "session opened at {conn_str} ({})",
            if temp_dir.is_some() { "temporary" } else { "persistent" }
        );
        Ok(Session {
            conn: Some(conn),
            conn_str,
            path,
            temp_dir,
            cursor_options: options.cursor,
        })
    }

    /// Opens a session configured by a connection string, see
    /// [`ConnectOptions::parse`].
    pub fn open_dsn<K>(connector: &K, dsn: &str) -> Result<Session<C>>
    where
        K: Connector<Connection = C>,
    {
        Self::open(connector, ConnectOptions::parse(dsn)?)
    }

    /// Runs `sql` with the default output format.
    pub fn query(&mut self, sql: &str) -> Result<Chunk> {
        self.query_with_format(sql, DEFAULT_OUTPUT_FORMAT)
    }

    pub fn query_with_format(&mut self, sql: &str, format: &str) -> Result<Chunk> {
        self.connection()?.query(sql, format)
    }

    /// Runs `sql` as a streaming query with the default output format.
    pub fn query_stream(&mut self, sql: &str) -> Result<C::Stream> {
        self.query_stream_with_format(sql, DEFAULT_OUTPUT_FORMAT)
    }

    pub fn query_stream_with_format(&mut self, sql: &str, format: &str) -> Result<C::Stream> {
        self.connection()?.query_stream(sql, format)
    }

    /// Runs `sql` as a streaming Parquet query and opens a row cursor over the
    /// result, configured with the session's cursor options.
    pub fn query_rows(&mut self, sql: &str) -> Result<StreamingRows> {
        let stream = self.query_stream_with_format(sql, STREAMING_FORMAT)?;
        StreamingRowsBuilder::new(stream)
            .with_options(self.cursor_options.clone())
            .build()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Connection string the engine connection was opened with.
    pub fn conn_str(&self) -> &str {
        &self.conn_str
    }

    /// Returns `true` if the working directory was created by the session.
    pub fn is_temp(&self) -> bool {
        self.temp_dir.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    pub fn cursor_options(&self) -> &CursorOptions {
        &self.cursor_options
    }

    /// Closes the connection and removes the working directory if it is
    /// temporary. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        let conn_res = self.close_connection();
        let dir_res = match self.temp_dir.take() {
            Some(temp_dir) => temp_dir
                .close()
                .map_err(|e| Error::io(self.conn_str.clone(), e)),
            None => Ok(()),
        };
        conn_res.and(dir_res)
    }

    /// Closes the connection and removes the working directory, temporary or
    /// not.
    pub fn cleanup(&mut self) -> Result<()> {
        let conn_res = self.close_connection();
        let removed = match self.temp_dir.take() {
            Some(temp_dir) => temp_dir.close(),
            None => std::fs::remove_dir_all(&self.path),
        };
        let dir_res = match removed {
            Ok(()) => {
                log::debug!("session directory {} removed", self.conn_str);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(self.conn_str.clone(), e)),
        };
        conn_res.and(dir_res)
    }

    fn connection(&mut self) -> Result<&mut C> {
        self.conn
            .as_mut()
            .ok_or_else(|| Error::invalid_operation("query on a closed session"))
    }

    fn close_connection(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(mut conn) => {
                log::debug!("closing session at {}", self.conn_str);
                conn.close()
            }
            None => Ok(()),
        }
    }
}

impl<C: Connection> Drop for Session<C> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::debug!("error closing session on drop: {e}");
        }
    }
}
