//! Fragment reassembly
//!
//! Collects the frames of multi-fragment messages until every index has
//! arrived. Single-fragment messages pass straight through without locking.
//!
//! ## Limits
//! - A message not completed within the expiry window is dropped
//! - At most `max_pending` incomplete messages are held at once
//! - Duplicate fragments are ignored

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use super::codec::{Frame, FrameKind};
use crate::error::{BeingError, Result};

/// A complete message body, ready for bincode decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: FrameKind,
    pub id: u64,
    pub body: Bytes,
}

struct Partial {
    kind: FrameKind,
    chunks: Vec<Option<Bytes>>,
    received: usize,
    started: Instant,
}

/// Incomplete messages keyed by sender and message id
pub struct Reassembler {
    pending: Mutex<HashMap<(SocketAddr, u64), Partial>>,
    expiry: Duration,
    max_pending: usize,
}

impl Reassembler {
    pub fn new(expiry: Duration, max_pending: usize) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            expiry,
            max_pending,
        }
    }

    /// Add one frame from `sender`; returns the message once it is complete
    pub fn push(&self, sender: SocketAddr, frame: Frame) -> Result<Option<Message>> {
        if frame.count == 1 {
            return Ok(Some(Message {
                kind: frame.kind,
                id: frame.message_id,
                body: frame.chunk,
            }));
        }

        let key = (sender, frame.message_id);
        let mut pending = self.pending.lock();

        let expiry = self.expiry;
        let before = pending.len();
        pending.retain(|_, partial| partial.started.elapsed() < expiry);
        if pending.len() < before {
            tracing::debug!("Expired {} incomplete message(s)", before - pending.len());
        }

        if !pending.contains_key(&key) && pending.len() >= self.max_pending {
            return Err(BeingError::Protocol(format!(
                "Too many incomplete messages (limit {})",
                self.max_pending
            )));
        }

        let partial = pending.entry(key).or_insert_with(|| Partial {
            kind: frame.kind,
            chunks: vec![None; frame.count as usize],
            received: 0,
            started: Instant::now(),
        });

        if partial.kind != frame.kind || partial.chunks.len() != frame.count as usize {
            pending.remove(&key);
            return Err(BeingError::Protocol(format!(
                "Inconsistent fragments for message {}",
                frame.message_id
            )));
        }

        let slot = &mut partial.chunks[frame.index as usize];
        if slot.is_none() {
            *slot = Some(frame.chunk);
            partial.received += 1;
        }
        if partial.received < partial.chunks.len() {
            return Ok(None);
        }

        let partial = match pending.remove(&key) {
            Some(partial) => partial,
            None => return Ok(None),
        };
        let size = partial.chunks.iter().flatten().map(Bytes::len).sum();
        let mut body = BytesMut::with_capacity(size);
        for chunk in partial.chunks.into_iter().flatten() {
            body.extend_from_slice(&chunk);
        }

        Ok(Some(Message {
            kind: partial.kind,
            id: frame.message_id,
            body: body.freeze(),
        }))
    }

    /// Number of incomplete messages held
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}
