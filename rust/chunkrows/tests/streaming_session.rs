use std::time::Duration;

use chunkrows::{
    ErrorKind, Result,
    chunk::{Chunk, IterChunkSource},
    cursor::RowCursor,
    session::{Connection, Connector, Session},
    value::Value,
};
use chunkrows_testkit::data_gen::{sequence_chunk_payloads, sequence_name};

/// Engine stand-in that answers every streaming query with the same
/// sequence result split into chunks.
struct SequenceEngine {
    chunk_rows: Vec<usize>,
    failure: Option<String>,
}

struct SequenceConnection {
    chunk_rows: Vec<usize>,
    failure: Option<String>,
}

impl Connector for SequenceEngine {
    type Connection = SequenceConnection;

    fn connect(&self, _conn_str: &str) -> Result<SequenceConnection> {
        Ok(SequenceConnection {
            chunk_rows: self.chunk_rows.clone(),
            failure: self.failure.clone(),
        })
    }
}

impl Connection for SequenceConnection {
    type Stream = IterChunkSource<std::vec::IntoIter<Chunk>>;

    fn query(&mut self, _sql: &str, _format: &str) -> Result<Chunk> {
        Ok(Chunk::new(&b"42\n"[..], 1))
    }

    fn query_stream(&mut self, _sql: &str, format: &str) -> Result<Self::Stream> {
        assert_eq!(format, "Parquet");
        let mut chunks = sequence_chunk_payloads(&self.chunk_rows)
            .unwrap()
            .into_iter()
            .map(|(payload, rows)| {
                let bytes_read = payload.len() as u64;
                Chunk::new(payload, rows).with_stats(bytes_read, Duration::from_millis(1))
            })
            .collect::<Vec<_>>();
        if let Some(message) = &self.failure {
            chunks.push(Chunk::failed(message.clone()));
        }
        Ok(IterChunkSource::new(chunks))
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_query_rows_through_session() {
    let engine = SequenceEngine {
        chunk_rows: vec![10, 25, 3],
        failure: None,
    };
    let mut session =
        Session::open_dsn(&engine, "bufferSize=4;useUnsafeStringReader=true").unwrap();
    assert!(session.is_temp());
    assert_eq!(session.cursor_options().prefetch_size, 4);

    let mut cursor = session.query_rows("SELECT * FROM sequence").unwrap();
    assert_eq!(cursor.columns(), vec!["id", "name", "score", "flag"]);
    assert_eq!(cursor.column_database_type_name(2).unwrap(), "DOUBLE");

    let mut expected_id = 0i64;
    while let Some(row) = cursor.next_row().unwrap() {
        assert_eq!(row.get(0), Some(&Value::Int64(expected_id)));
        match sequence_name(expected_id) {
            Some(name) => assert_eq!(row.get(1).and_then(Value::as_str), Some(name.as_str())),
            None => assert!(row.get(1).unwrap().is_null()),
        }
        assert_eq!(row.get(2), Some(&Value::Float64(expected_id as f64 * 0.5)));
        assert_eq!(row.get(3), Some(&Value::Boolean(expected_id % 2 == 0)));
        expected_id += 1;
    }
    assert_eq!(expected_id, 38);
    assert_eq!(cursor.chunks_consumed(), 3);
    cursor.close().unwrap();
    session.close().unwrap();
}

#[test]
fn test_engine_failure_surfaces_as_chunk_error() {
    let engine = SequenceEngine {
        chunk_rows: vec![5],
        failure: Some("Code: 159. Timeout exceeded".to_string()),
    };
    let mut session = Session::open_dsn(&engine, "").unwrap();
    let rows = session
        .query_rows("SELECT * FROM sequence")
        .unwrap()
        .into_owned_rows()
        .collect::<Vec<_>>();
    assert_eq!(rows.len(), 6);
    assert!(rows[..5].iter().all(|row| row.is_ok()));
    let err = rows[5].as_ref().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Chunk { .. }));
    assert!(err.to_string().contains("Timeout exceeded"));
}

#[test]
fn test_plain_query() {
    let engine = SequenceEngine {
        chunk_rows: vec![],
        failure: None,
    };
    let mut session = Session::open_dsn(&engine, "").unwrap();
    let result = session.query("SELECT 42").unwrap();
    assert_eq!(&result.data()[..], b"42\n");
}
