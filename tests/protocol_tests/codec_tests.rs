//! Codec Tests
//!
//! Tests for request and response framing:
//! - Single and multi-fragment messages
//! - Request ids carried through both directions
//! - Header, length and checksum validation

use std::net::SocketAddr;
use std::time::Duration;

use beingkv::config::MAX_UDP_PAYLOAD;
use beingkv::protocol::{
    decode_frame, decode_request, decode_response, encode_request, encode_response,
    peek_message_id, Frame, FrameKind, Message, Reassembler, Request, Response, HEADER_SIZE,
    MAX_CHUNK_SIZE, SAVE_DUMP,
};
use beingkv::BeingError;
use bytes::Bytes;

// =============================================================================
// Helper Functions
// =============================================================================

fn addr() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

fn sample_request() -> Request {
    Request::new("remove_key", vec!["3".to_string()], addr()).with_id(42)
}

fn frames(datagrams: Vec<Vec<u8>>) -> Vec<Frame> {
    datagrams
        .into_iter()
        .map(|d| decode_frame(&Bytes::from(d)).unwrap())
        .collect()
}

/// Reassemble a message that fits in one datagram
fn single(datagrams: Vec<Vec<u8>>) -> Message {
    assert_eq!(datagrams.len(), 1);
    let frame = frames(datagrams).remove(0);
    Message {
        kind: frame.kind,
        id: frame.message_id,
        body: frame.chunk,
    }
}

fn reassemble(datagrams: Vec<Vec<u8>>) -> Message {
    let reassembler = Reassembler::new(Duration::from_secs(5), 4);
    let mut complete = None;
    for frame in frames(datagrams) {
        if let Some(message) = reassembler.push(addr(), frame).unwrap() {
            complete = Some(message);
        }
    }
    complete.unwrap()
}

// =============================================================================
// Request Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_request() {
    let encoded = encode_request(&sample_request(), MAX_UDP_PAYLOAD).unwrap();
    assert_eq!(encoded[0][0], FrameKind::Request as u8);

    let decoded = decode_request(&single(encoded), addr()).unwrap();
    assert_eq!(decoded, sample_request());
}

#[test]
fn test_request_with_payload() {
    let request = Request::new(SAVE_DUMP, vec![], addr()).with_payload("<humanBeings/>");
    let encoded = encode_request(&request, MAX_UDP_PAYLOAD).unwrap();
    let decoded = decode_request(&single(encoded), addr()).unwrap();
    assert_eq!(decoded.payload.as_deref(), Some("<humanBeings/>"));
    assert!(decoded.is_persistence());
}

#[test]
fn test_origin_comes_from_caller() {
    let encoded = encode_request(&sample_request(), MAX_UDP_PAYLOAD).unwrap();
    let other: SocketAddr = "10.0.0.1:1234".parse().unwrap();
    assert_eq!(decode_request(&single(encoded), other).unwrap().origin, other);
}

#[test]
fn test_parse_line() {
    let request = Request::parse_line("  insert 1 name=Ann  ", addr()).unwrap();
    assert_eq!(request.command, "insert");
    assert_eq!(request.args, vec!["1", "name=Ann"]);
    assert!(Request::parse_line("   ", addr()).is_none());
}

#[test]
fn test_decode_empty_command_is_error() {
    let encoded = encode_request(&Request::new("", vec![], addr()), MAX_UDP_PAYLOAD).unwrap();
    assert!(matches!(
        decode_request(&single(encoded), addr()),
        Err(BeingError::Protocol(_))
    ));
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_response() {
    let response = Response::ok("done", addr()).in_reply_to(7);
    let encoded = encode_response(&response, MAX_UDP_PAYLOAD).unwrap();
    assert_eq!(encoded[0][0], FrameKind::Response as u8);
    assert_eq!(peek_message_id(&encoded[0]), Some(7));

    assert_eq!(decode_response(&single(encoded), addr()).unwrap(), response);
}

#[test]
fn test_response_with_payload() {
    let response = Response::ok("dump", addr()).with_payload("<humanBeings/>");
    let encoded = encode_response(&response, MAX_UDP_PAYLOAD).unwrap();
    let decoded = decode_response(&single(encoded), addr()).unwrap();
    assert_eq!(decoded.payload.as_deref(), Some("<humanBeings/>"));
}

#[test]
fn test_kind_mismatch_is_error() {
    let encoded = encode_response(&Response::ok("hi", addr()), MAX_UDP_PAYLOAD).unwrap();
    assert!(matches!(
        decode_request(&single(encoded), addr()),
        Err(BeingError::Protocol(_))
    ));
}

// =============================================================================
// Fragmentation Tests
// =============================================================================

#[test]
fn test_large_response_spans_fragments() {
    let xml = "<humanBeing/>".repeat(20_000);
    let response = Response::ok("dump", addr()).with_payload(xml.clone()).in_reply_to(9);

    let encoded = encode_response(&response, MAX_UDP_PAYLOAD).unwrap();
    assert!(encoded.len() >= 4);
    assert!(encoded.iter().all(|d| d.len() <= MAX_UDP_PAYLOAD));

    let parsed = frames(encoded.clone());
    for (i, frame) in parsed.iter().enumerate() {
        assert_eq!(frame.index as usize, i);
        assert_eq!(frame.count as usize, parsed.len());
        assert_eq!(frame.message_id, 9);
    }

    let decoded = decode_response(&reassemble(encoded), addr()).unwrap();
    assert_eq!(decoded.payload.as_deref(), Some(xml.as_str()));
    assert_eq!(decoded.request_id, 9);
}

#[test]
fn test_small_datagram_limit() {
    let request = Request::new(SAVE_DUMP, vec![], addr())
        .with_payload("x".repeat(1000))
        .with_id(3);
    let encoded = encode_request(&request, 128).unwrap();
    assert!(encoded.len() > 8);
    assert!(encoded.iter().all(|d| d.len() <= 128));

    assert_eq!(decode_request(&reassemble(encoded), addr()).unwrap(), request);
}

#[test]
fn test_datagram_limit_must_exceed_header() {
    assert!(encode_request(&sample_request(), HEADER_SIZE).is_err());
    assert!(encode_request(&sample_request(), MAX_UDP_PAYLOAD + 1).is_err());
}

// =============================================================================
// Frame Validation Tests
// =============================================================================

#[test]
fn test_incomplete_header() {
    let result = decode_frame(&Bytes::from_static(&[0x01, 0x00, 0x00]));
    assert!(matches!(result, Err(BeingError::Protocol(_))));
    assert!(decode_frame(&Bytes::new()).is_err());
    assert_eq!(peek_message_id(&[0x01, 0x00]), None);
}

#[test]
fn test_unknown_kind() {
    let mut encoded = encode_request(&sample_request(), MAX_UDP_PAYLOAD).unwrap().remove(0);
    encoded[0] = 0x7f;
    assert!(decode_frame(&Bytes::from(encoded)).is_err());
}

#[test]
fn test_corrupted_body_fails_checksum() {
    let mut encoded = encode_request(&sample_request(), MAX_UDP_PAYLOAD).unwrap().remove(0);
    let last = encoded.len() - 1;
    encoded[last] ^= 0xff;

    let err = decode_frame(&Bytes::from(encoded)).unwrap_err();
    assert!(err.to_string().contains("Checksum mismatch"));
}

#[test]
fn test_corrupted_id_fails_checksum() {
    let mut encoded = encode_request(&sample_request(), MAX_UDP_PAYLOAD).unwrap().remove(0);
    encoded[8] ^= 0x01;
    assert!(decode_frame(&Bytes::from(encoded)).is_err());
}

#[test]
fn test_truncated_datagram() {
    let encoded = encode_request(&sample_request(), MAX_UDP_PAYLOAD).unwrap().remove(0);
    let truncated = Bytes::copy_from_slice(&encoded[..encoded.len() - 2]);
    assert!(decode_frame(&truncated).is_err());
}

#[test]
fn test_trailing_garbage() {
    let mut encoded = encode_request(&sample_request(), MAX_UDP_PAYLOAD).unwrap().remove(0);
    encoded.push(0);
    assert!(decode_frame(&Bytes::from(encoded)).is_err());
}

#[test]
fn test_bad_fragment_position() {
    let mut encoded = encode_request(&sample_request(), MAX_UDP_PAYLOAD).unwrap().remove(0);
    // index 1 of count 1
    encoded[10] = 1;
    assert!(decode_frame(&Bytes::from(encoded)).is_err());
}

#[test]
fn test_oversized_length_field() {
    let mut datagram = vec![FrameKind::Request as u8];
    datagram.extend_from_slice(&1u64.to_be_bytes());
    datagram.extend_from_slice(&0u16.to_be_bytes());
    datagram.extend_from_slice(&1u16.to_be_bytes());
    datagram.extend_from_slice(&((MAX_CHUNK_SIZE + 1) as u32).to_be_bytes());
    datagram.extend_from_slice(&0u32.to_be_bytes());
    assert_eq!(datagram.len(), HEADER_SIZE);

    assert!(decode_frame(&Bytes::from(datagram)).is_err());
}
