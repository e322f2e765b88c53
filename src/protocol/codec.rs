//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! A message (request or response) is a bincode body split into one or more
//! fragments, one fragment per UDP datagram:
//! ```text
//! ┌──────────┬────────┬───────────┬───────────┬─────────┬─────────┬──────────────┐
//! │ Kind (1) │ Id (8) │ Index (2) │ Count (2) │ Len (4) │ CRC (4) │ Chunk (Len)  │
//! └──────────┴────────┴───────────┴───────────┴─────────┴─────────┴──────────────┘
//! ```
//!
//! - Kind: 0x01 request, 0x02 response
//! - Id: chosen by the client, echoed in every fragment of the response
//! - Index/Count: position of this fragment, total fragments (Count >= 1)
//! - All integers big-endian; CRC is CRC32 over Id, Index, Count and Chunk

use std::net::SocketAddr;

use bytes::Bytes;

use crate::config::MAX_UDP_PAYLOAD;
use crate::error::{BeingError, Result};

use super::reassembly::Message;
use super::request::RequestBody;
use super::response::ResponseBody;
use super::{Request, Response};

/// Header size: kind + id + index + count + length + CRC
pub const HEADER_SIZE: usize = 1 + 8 + 2 + 2 + 4 + 4;

/// Largest chunk that fits in one datagram
pub const MAX_CHUNK_SIZE: usize = MAX_UDP_PAYLOAD - HEADER_SIZE;

/// Most fragments one message may be split into
pub const MAX_FRAGMENTS: usize = u16::MAX as usize;

/// Frame kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    Request = 0x01,
    Response = 0x02,
}

impl FrameKind {
    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(FrameKind::Request),
            0x02 => Ok(FrameKind::Response),
            other => Err(BeingError::Protocol(format!(
                "Unknown frame kind: 0x{:02x}",
                other
            ))),
        }
    }
}

/// One decoded datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub message_id: u64,
    pub index: u16,
    pub count: u16,
    pub chunk: Bytes,
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request into datagrams no larger than `max_datagram_size`
pub fn encode_request(request: &Request, max_datagram_size: usize) -> Result<Vec<Vec<u8>>> {
    let body = RequestBody {
        command: request.command.clone(),
        args: request.args.clone(),
        payload: request.payload.clone(),
    };
    fragment(
        FrameKind::Request,
        request.id,
        &bincode::serialize(&body)?,
        max_datagram_size,
    )
}

/// Decode a reassembled request received from `origin`
pub fn decode_request(message: &Message, origin: SocketAddr) -> Result<Request> {
    expect_kind(message, FrameKind::Request)?;
    let body: RequestBody = bincode::deserialize(&message.body)?;

    if body.command.trim().is_empty() {
        return Err(BeingError::Protocol("empty command name".to_string()));
    }

    Ok(Request {
        id: message.id,
        command: body.command,
        args: body.args,
        payload: body.payload,
        origin,
    })
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response into datagrams no larger than `max_datagram_size`
pub fn encode_response(response: &Response, max_datagram_size: usize) -> Result<Vec<Vec<u8>>> {
    let body = ResponseBody {
        success: response.success,
        message: response.message.clone(),
        payload: response.payload.clone(),
    };
    fragment(
        FrameKind::Response,
        response.request_id,
        &bincode::serialize(&body)?,
        max_datagram_size,
    )
}

/// Decode a reassembled response; `destination` is the local address it arrived on
pub fn decode_response(message: &Message, destination: SocketAddr) -> Result<Response> {
    expect_kind(message, FrameKind::Response)?;
    let body: ResponseBody = bincode::deserialize(&message.body)?;

    Ok(Response {
        request_id: message.id,
        message: body.message,
        success: body.success,
        payload: body.payload,
        destination,
    })
}

fn expect_kind(message: &Message, expected: FrameKind) -> Result<()> {
    if message.kind != expected {
        return Err(BeingError::Protocol(format!(
            "Unexpected frame kind: 0x{:02x} (expected 0x{:02x})",
            message.kind as u8, expected as u8
        )));
    }
    Ok(())
}

// =============================================================================
// Framing
// =============================================================================

/// Split `body` into frames; an empty body still produces one frame
fn fragment(
    kind: FrameKind,
    message_id: u64,
    body: &[u8],
    max_datagram_size: usize,
) -> Result<Vec<Vec<u8>>> {
    if max_datagram_size <= HEADER_SIZE || max_datagram_size > MAX_UDP_PAYLOAD {
        return Err(BeingError::Protocol(format!(
            "Datagram size {} must be within {}..={}",
            max_datagram_size,
            HEADER_SIZE + 1,
            MAX_UDP_PAYLOAD
        )));
    }

    let chunk_size = max_datagram_size - HEADER_SIZE;
    let count = body.len().div_ceil(chunk_size).max(1);
    if count > MAX_FRAGMENTS {
        return Err(BeingError::Protocol(format!(
            "Message too large: {} bytes needs {} fragments (max {})",
            body.len(),
            count,
            MAX_FRAGMENTS
        )));
    }

    let chunks: Vec<&[u8]> = if body.is_empty() {
        vec![body]
    } else {
        body.chunks(chunk_size).collect()
    };

    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| frame(kind, message_id, index as u16, count as u16, chunk))
        .collect())
}

fn frame(kind: FrameKind, message_id: u64, index: u16, count: u16, chunk: &[u8]) -> Vec<u8> {
    let mut datagram = Vec::with_capacity(HEADER_SIZE + chunk.len());
    datagram.push(kind as u8);
    datagram.extend_from_slice(&message_id.to_be_bytes());
    datagram.extend_from_slice(&index.to_be_bytes());
    datagram.extend_from_slice(&count.to_be_bytes());
    datagram.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
    datagram.extend_from_slice(&checksum(&datagram[1..13], chunk).to_be_bytes());
    datagram.extend_from_slice(chunk);
    datagram
}

/// CRC32 over the id/index/count fields and the chunk
fn checksum(fields: &[u8], chunk: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(fields);
    hasher.update(chunk);
    hasher.finalize()
}

/// Parse and verify one datagram. The chunk shares `datagram`'s buffer.
pub fn decode_frame(datagram: &Bytes) -> Result<Frame> {
    if datagram.len() < HEADER_SIZE {
        return Err(BeingError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            datagram.len()
        )));
    }

    let kind = FrameKind::from_byte(datagram[0])?;
    let message_id = read_u64(&datagram[1..9]);
    let index = u16::from_be_bytes([datagram[9], datagram[10]]);
    let count = u16::from_be_bytes([datagram[11], datagram[12]]);
    let chunk_len =
        u32::from_be_bytes([datagram[13], datagram[14], datagram[15], datagram[16]]) as usize;
    let expected_crc =
        u32::from_be_bytes([datagram[17], datagram[18], datagram[19], datagram[20]]);

    if count == 0 || index >= count {
        return Err(BeingError::Protocol(format!(
            "Bad fragment position: {} of {}",
            index, count
        )));
    }

    if chunk_len > MAX_CHUNK_SIZE {
        return Err(BeingError::Protocol(format!(
            "Chunk too large: {} bytes (max {})",
            chunk_len, MAX_CHUNK_SIZE
        )));
    }

    let total_len = HEADER_SIZE + chunk_len;
    if datagram.len() != total_len {
        return Err(BeingError::Protocol(format!(
            "Frame length mismatch: header says {} bytes, datagram has {}",
            total_len,
            datagram.len()
        )));
    }

    let chunk = datagram.slice(HEADER_SIZE..);
    let actual_crc = checksum(&datagram[1..13], &chunk);
    if actual_crc != expected_crc {
        return Err(BeingError::Protocol(format!(
            "Checksum mismatch: expected {:08x}, got {:08x}",
            expected_crc, actual_crc
        )));
    }

    Ok(Frame {
        kind,
        message_id,
        index,
        count,
        chunk,
    })
}

/// Message id of a datagram whose header is present but may not verify
pub fn peek_message_id(datagram: &[u8]) -> Option<u64> {
    if datagram.len() < HEADER_SIZE {
        return None;
    }
    Some(read_u64(&datagram[1..9]))
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut id = [0u8; 8];
    id.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(id)
}
