//! Reassembly Tests
//!
//! Tests verify:
//! - Fragments complete in any order
//! - Duplicates are ignored
//! - Senders and message ids are kept apart
//! - Expiry and the pending-message limit

use std::net::SocketAddr;
use std::thread;
use std::time::Duration;

use beingkv::protocol::{decode_frame, encode_response, Frame, Reassembler, Response};
use bytes::Bytes;

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Fragments of a response whose payload needs several 64-byte datagrams
fn fragments(id: u64) -> (Response, Vec<Frame>) {
    let response = Response::ok("dump", addr(1))
        .with_payload("abcdefghij".repeat(30))
        .in_reply_to(id);
    let frames = encode_response(&response, 64)
        .unwrap()
        .into_iter()
        .map(|d| decode_frame(&Bytes::from(d)).unwrap())
        .collect();
    (response, frames)
}

fn reassembler() -> Reassembler {
    Reassembler::new(Duration::from_secs(5), 8)
}

#[test]
fn test_out_of_order_with_duplicates() {
    let (_, mut frames) = fragments(1);
    let count = frames.len();
    assert!(count > 3);
    frames.reverse();
    let duplicate = frames[0].clone();
    frames.insert(1, duplicate);

    let reassembler = reassembler();
    let mut results: Vec<_> = frames
        .into_iter()
        .map(|f| reassembler.push(addr(1), f).unwrap())
        .collect();

    let message = results.pop().unwrap().unwrap();
    assert!(results.iter().all(Option::is_none));
    assert_eq!(message.id, 1);
    assert_eq!(reassembler.pending(), 0);
}

#[test]
fn test_interleaved_messages_stay_apart() {
    let (_, first) = fragments(1);
    let (_, second) = fragments(2);
    let reassembler = reassembler();

    let mut done = Vec::new();
    for (a, b) in first.into_iter().zip(second) {
        done.extend(reassembler.push(addr(1), a).unwrap());
        done.extend(reassembler.push(addr(2), b).unwrap());
    }

    let ids: Vec<u64> = done.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_inconsistent_count_is_rejected() {
    let (_, short) = fragments(5);
    let long_response = Response::ok("dump", addr(1))
        .with_payload("z".repeat(2000))
        .in_reply_to(5);
    let long: Vec<Frame> = encode_response(&long_response, 64)
        .unwrap()
        .into_iter()
        .map(|d| decode_frame(&Bytes::from(d)).unwrap())
        .collect();
    assert_ne!(short.len(), long.len());

    let reassembler = reassembler();
    assert!(reassembler.push(addr(1), short[0].clone()).unwrap().is_none());
    assert!(reassembler.push(addr(1), long[1].clone()).is_err());
    assert_eq!(reassembler.pending(), 0);
}

#[test]
fn test_pending_limit() {
    let reassembler = Reassembler::new(Duration::from_secs(5), 2);
    for id in 0..2 {
        let (_, frames) = fragments(id);
        assert!(reassembler.push(addr(1), frames[0].clone()).unwrap().is_none());
    }

    let (_, frames) = fragments(99);
    assert!(reassembler.push(addr(1), frames[0].clone()).is_err());
}

#[test]
fn test_incomplete_messages_expire() {
    let reassembler = Reassembler::new(Duration::from_millis(20), 1);
    let (_, stale) = fragments(1);
    assert!(reassembler.push(addr(1), stale[0].clone()).unwrap().is_none());

    thread::sleep(Duration::from_millis(50));

    // The stale entry no longer counts against the limit
    let (_, fresh) = fragments(2);
    assert!(reassembler.push(addr(1), fresh[0].clone()).unwrap().is_none());
    assert_eq!(reassembler.pending(), 1);
}
