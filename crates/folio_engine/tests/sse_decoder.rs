use std::convert::Infallible;

use folio_core::ProgressMessage;
use folio_engine::{parse_record, ProgressReader, SseDecoder};
use futures_util::stream;
use pretty_assertions::assert_eq;

const STREAM: &str = concat!(
    ": keep-alive\n\n",
    "data: {\"event\":\"start\",\"total_nodes\":50}\n\n",
    "event: progress\n",
    "data: {\"event\":\"batch_start\",\"batch\":1,\"sections\":[\"Überblick\",\"財務\"]}\n\n",
    "data: {\"event\":\"batch_done\",\"batch\":1,\"batch_actionables\":4,\"cumulative_actionables\":4}\n\n",
);

fn decode_in_chunks(chunks: &[&[u8]]) -> Vec<String> {
    let mut decoder = SseDecoder::new();
    let mut records = Vec::new();
    for chunk in chunks {
        records.extend(decoder.push(chunk));
    }
    assert_eq!(decoder.finish(), None);
    records
}

#[test]
fn every_split_point_yields_the_same_records() {
    let bytes = STREAM.as_bytes();
    let whole = decode_in_chunks(&[bytes]);
    assert_eq!(whole.len(), 3);

    for split in 0..=bytes.len() {
        let (head, tail) = bytes.split_at(split);
        assert_eq!(decode_in_chunks(&[head, tail]), whole, "split at {split}");
    }
}

#[test]
fn byte_at_a_time_delivery_matches_whole_stream() {
    let bytes = STREAM.as_bytes();
    let singles: Vec<&[u8]> = bytes.chunks(1).collect();
    assert_eq!(decode_in_chunks(&singles), decode_in_chunks(&[bytes]));
}

#[test]
fn incomplete_record_is_held_back() {
    let mut decoder = SseDecoder::new();
    assert!(decoder
        .push(b"data: {\"event\":\"start\",\"total_nodes\":3}\n")
        .is_empty());
    assert_eq!(
        decoder.push(b"\n"),
        vec!["{\"event\":\"start\",\"total_nodes\":3}".to_string()]
    );
}

#[test]
fn unterminated_tail_is_not_a_record() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.push(b"data: {\"event\":\"keepalive\"}").is_empty());
    assert_eq!(
        decoder.finish(),
        Some("data: {\"event\":\"keepalive\"}".to_string())
    );
}

#[test]
fn malformed_payload_is_skipped() {
    assert_eq!(parse_record("{\"event\":\"start\""), None);
    assert_eq!(parse_record("{\"event\":\"no_such_event\"}"), None);
    assert_eq!(
        parse_record("{\"event\":\"start\",\"total_nodes\":7}"),
        Some(ProgressMessage::Start { total_nodes: 7 })
    );
}

#[tokio::test]
async fn reader_yields_messages_across_chunk_boundaries() {
    let chunks: Vec<Result<Vec<u8>, Infallible>> = vec![
        Ok(b"data: {\"event\":\"start\",\"total".to_vec()),
        Ok(b"_nodes\":2}\n\ndata: not json\n\ndata: {\"event\":\"er".to_vec()),
        Ok(b"ror\",\"message\":\"boom\"}\n\n".to_vec()),
    ];
    let mut reader = ProgressReader::new(stream::iter(chunks));

    let mut messages = Vec::new();
    while let Some(next) = reader.next_message().await {
        messages.push(next.unwrap());
    }

    assert_eq!(
        messages,
        vec![
            ProgressMessage::Start { total_nodes: 2 },
            ProgressMessage::Error {
                message: "boom".into()
            },
        ]
    );
}

#[tokio::test]
async fn reader_surfaces_transport_error_and_stops() {
    let chunks: Vec<Result<&[u8], String>> = vec![
        Ok(b"data: {\"event\":\"keepalive\"}\n\n"),
        Err("connection reset".to_string()),
        Ok(b"data: {\"event\":\"start\",\"total_nodes\":1}\n\n"),
    ];
    let mut reader = ProgressReader::new(stream::iter(chunks));

    assert_eq!(
        reader.next_message().await,
        Some(Ok(ProgressMessage::Keepalive))
    );
    assert_eq!(
        reader.next_message().await,
        Some(Err("connection reset".to_string()))
    );
    assert_eq!(reader.next_message().await, None);
}
