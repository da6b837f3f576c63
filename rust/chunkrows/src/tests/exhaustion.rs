use chunkrows_common::ErrorKind;

use crate::{
    chunk::Chunk,
    cursor::{RowCursor, StreamingRowsBuilder},
    options::EmptyChunkPolicy,
    tests::chunk_store::{CountingSource, collect_rows, open_rows, row_ids, sequence_chunks},
};

const CHUNK_PATTERNS: &[&[usize]] = &[
    &[1],
    &[5],
    &[3, 4],
    &[1, 1, 1, 1],
    &[10, 0, 5],
    &[2, 2, 0],
    &[0, 3],
    &[1000, 17],
    &[7, 7, 7],
    &[2500],
];

const PREFETCH_SIZES: &[usize] = &[1, 7, 10_000];

/// Rows surfaced before the stream ends under `policy`.
fn expected_rows(pattern: &[usize], policy: EmptyChunkPolicy) -> usize {
    match policy {
        EmptyChunkPolicy::Terminate => pattern.iter().take_while(|&&rows| rows != 0).sum(),
        EmptyChunkPolicy::Skip => pattern.iter().sum(),
    }
}

fn read_ids(pattern: &[usize], prefetch_size: usize, policy: EmptyChunkPolicy) -> Vec<i64> {
    let cursor = StreamingRowsBuilder::new(CountingSource::new(sequence_chunks(pattern)).0)
        .with_prefetch_size(prefetch_size)
        .with_empty_chunk_policy(policy)
        .build()
        .unwrap();
    row_ids(&collect_rows(cursor).unwrap())
}

#[test]
fn test_every_row_surfaced_once() {
    for policy in [EmptyChunkPolicy::Terminate, EmptyChunkPolicy::Skip] {
        for pattern in CHUNK_PATTERNS {
            for &prefetch_size in PREFETCH_SIZES {
                let ids = read_ids(pattern, prefetch_size, policy);
                let expected = (0..expected_rows(pattern, policy) as i64).collect::<Vec<_>>();
                assert_eq!(
                    ids, expected,
                    "pattern {pattern:?}, prefetch {prefetch_size}, {policy:?}"
                );
            }
        }
    }
}

#[test]
fn test_rows_independent_of_prefetch_size() {
    for pattern in CHUNK_PATTERNS {
        let runs = PREFETCH_SIZES
            .iter()
            .map(|&prefetch_size| {
                let (source, _counters) = CountingSource::new(sequence_chunks(pattern));
                let cursor = StreamingRowsBuilder::new(source)
                    .with_prefetch_size(prefetch_size)
                    .build()
                    .unwrap();
                collect_rows(cursor).unwrap()
            })
            .collect::<Vec<_>>();
        assert!(runs.windows(2).all(|w| w[0] == w[1]), "pattern {pattern:?}");
    }
}

#[test]
fn test_end_of_data_is_sticky() {
    let mut cursor = open_rows(sequence_chunks(&[2]));
    assert!(cursor.next_row().unwrap().is_some());
    assert!(cursor.next_row().unwrap().is_some());
    for _ in 0..3 {
        assert!(cursor.next_row().unwrap().is_none());
    }
    assert_eq!(cursor.rows_consumed(), 2);
    assert_eq!(cursor.chunks_consumed(), 1);
}

#[test]
fn test_zero_row_first_chunk() {
    let (source, counters) = CountingSource::new(sequence_chunks(&[0, 3]));
    let mut cursor = StreamingRowsBuilder::new(source).build().unwrap();
    assert!(cursor.next_row().unwrap().is_none());
    assert!(cursor.next_row().unwrap().is_none());
    assert_eq!(counters.fetches(), 1);
    assert_eq!(cursor.columns(), vec!["id", "name", "score", "flag"]);
}

#[test]
fn test_zero_row_first_chunk_skipped() {
    let (source, counters) = CountingSource::new(sequence_chunks(&[0, 3]));
    let cursor = StreamingRowsBuilder::new(source)
        .with_empty_chunk_policy(EmptyChunkPolicy::Skip)
        .build()
        .unwrap();
    assert_eq!(row_ids(&collect_rows(cursor).unwrap()), vec![0, 1, 2]);
    assert_eq!(counters.fetches(), 3);
}

#[test]
fn test_empty_stream() {
    let mut cursor = open_rows(Vec::new());
    assert!(cursor.next_row().unwrap().is_none());
    assert!(cursor.columns().is_empty());
    assert!(matches!(
        cursor.column_database_type_name(0).unwrap_err().kind(),
        ErrorKind::InvalidOperation { .. }
    ));
}

#[test]
fn test_chunks_fetched_lazily() {
    let (source, counters) = CountingSource::new(sequence_chunks(&[2, 2]));
    let mut cursor = StreamingRowsBuilder::new(source)
        .with_prefetch_size(1)
        .build()
        .unwrap();
    assert_eq!(counters.fetches(), 1);
    cursor.next_row().unwrap().unwrap();
    cursor.next_row().unwrap().unwrap();
    assert_eq!(counters.fetches(), 1);
    cursor.next_row().unwrap().unwrap();
    assert_eq!(counters.fetches(), 2);
}

#[test]
fn test_chunk_error_on_first_chunk() {
    let (source, counters) = CountingSource::new(vec![Chunk::failed("Code: 60. Unknown table")]);
    let err = StreamingRowsBuilder::new(source).build().err().unwrap();
    match err.kind() {
        ErrorKind::Chunk { message } => assert_eq!(message, "Code: 60. Unknown table"),
        other => panic!("unexpected error kind: {other:?}"),
    }
    assert_eq!(counters.closes(), 1);
}

#[test]
fn test_chunk_error_mid_stream() {
    let mut chunks = sequence_chunks(&[2]);
    chunks.push(Chunk::failed("Code: 241. Memory limit exceeded"));
    let mut cursor = open_rows(chunks);
    assert!(cursor.next_row().unwrap().is_some());
    assert!(cursor.next_row().unwrap().is_some());
    let err = cursor.next_row().err().unwrap();
    assert!(matches!(err.kind(), ErrorKind::Chunk { .. }));
    assert!(err.is_data_error());
    cursor.close().unwrap();
}

#[test]
fn test_chunk_error_stops_cursor() {
    let mut chunks = sequence_chunks(&[2]);
    chunks.push(Chunk::failed("Code: 241. Memory limit exceeded"));
    chunks.extend(sequence_chunks(&[3]));
    let (source, counters) = CountingSource::new(chunks);
    let mut cursor = StreamingRowsBuilder::new(source).build().unwrap();
    assert!(cursor.next_row().unwrap().is_some());
    assert!(cursor.next_row().unwrap().is_some());
    let err = cursor.next_row().err().unwrap();
    assert!(matches!(err.kind(), ErrorKind::Chunk { .. }));
    assert_eq!(counters.closes(), 1);

    for _ in 0..3 {
        let err = cursor.next_row().err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::InvalidOperation { .. }));
    }
    assert_eq!(counters.fetches(), 2);
    assert_eq!(cursor.rows_consumed(), 2);
    cursor.close().unwrap();
    assert_eq!(counters.closes(), 1);
}

#[test]
fn test_owned_rows_end_after_chunk_error() {
    let mut chunks = sequence_chunks(&[2]);
    chunks.push(Chunk::failed("Code: 241. Memory limit exceeded"));
    chunks.extend(sequence_chunks(&[3]));
    let rows = open_rows(chunks).into_owned_rows().collect::<Vec<_>>();
    assert_eq!(rows.len(), 3);
    assert!(rows[..2].iter().all(|row| row.is_ok()));
    assert!(matches!(rows[2].as_ref().unwrap_err().kind(), ErrorKind::Chunk { .. }));
}

#[test]
fn test_failed_first_payload_closes_source() {
    let (source, counters) = CountingSource::new(vec![Chunk::new(&b"not parquet"[..], 1)]);
    assert!(StreamingRowsBuilder::new(source).build().is_err());
    assert_eq!(counters.fetches(), 1);
    assert_eq!(counters.closes(), 1);
}

#[test]
fn test_next_into_slot() {
    let mut cursor = open_rows(sequence_chunks(&[2]));
    let mut slot = Vec::new();
    assert!(cursor.next_into(&mut slot).unwrap());
    assert_eq!(slot.len(), 4);
    assert!(cursor.next_into(&mut slot).unwrap());
    assert_eq!(slot[0], crate::value::Value::Int64(1));
    assert!(!cursor.next_into(&mut slot).unwrap());
    assert_eq!(slot[0], crate::value::Value::Int64(1));
}
