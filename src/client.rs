//! Datagram client
//!
//! Blocking request/response over one UDP socket. Used by `beingkv-cli` and
//! by the end-to-end tests.
//!
//! Every request gets a fresh id. Replies carrying another id (answers to
//! requests that already timed out) are dropped, so a slow reply can never be
//! mistaken for the answer to a later request.

use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::config::MAX_UDP_PAYLOAD;
use crate::error::{BeingError, Result};
use crate::protocol::{
    decode_frame, decode_response, encode_request, FrameKind, Reassembler, Request, Response,
    GET_DUMP, SAVE_DUMP,
};

const RECV_BUFFER_SIZE: usize = 65_536;

/// Incomplete replies kept while waiting; only one is ever expected
const MAX_PENDING_REPLIES: usize = 4;

/// A connected client
pub struct Client {
    socket: UdpSocket,
    local_addr: SocketAddr,
    server_addr: SocketAddr,
    timeout: Duration,
    max_datagram_size: usize,
    next_id: AtomicU64,
}

impl Client {
    /// Bind an ephemeral port and point it at `server`.
    ///
    /// Replies slower than `timeout` are reported as [`BeingError::Timeout`].
    pub fn connect(server: &str, timeout: Duration) -> Result<Self> {
        let server_addr = server
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| BeingError::Config(format!("cannot resolve '{}'", server)))?;

        let any: SocketAddr = if server_addr.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(any)?;
        // Only accept datagrams from the server
        socket.connect(server_addr)?;
        let local_addr = socket.local_addr()?;

        tracing::debug!("Client {} talking to {}", local_addr, server_addr);

        Ok(Self {
            socket,
            local_addr,
            server_addr,
            timeout,
            max_datagram_size: MAX_UDP_PAYLOAD,
            next_id: AtomicU64::new(1),
        })
    }

    /// Split outgoing requests into datagrams of at most `size` bytes
    pub fn with_max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size;
        self
    }

    /// Run a registry command
    pub fn execute(&self, command: &str, args: &[String]) -> Result<Response> {
        self.send(&Request::new(command, args.to_vec(), self.local_addr))
    }

    /// Run a console-style line such as `remove_key 3`
    pub fn execute_line(&self, line: &str) -> Result<Option<Response>> {
        match Request::parse_line(line, self.local_addr) {
            Some(request) => self.send(&request).map(Some),
            None => Ok(None),
        }
    }

    /// Fetch the server's collection as an XML snapshot
    pub fn get_dump(&self) -> Result<String> {
        let response = self.send(&Request::new(GET_DUMP, Vec::new(), self.local_addr))?;
        match response.payload {
            Some(xml) if response.success => Ok(xml),
            _ => Err(BeingError::Protocol(format!(
                "get_dump failed: {}",
                response.message
            ))),
        }
    }

    /// Replace the server's collection with an XML snapshot
    pub fn save_dump(&self, xml: &str) -> Result<Response> {
        self.send(&Request::new(SAVE_DUMP, Vec::new(), self.local_addr).with_payload(xml))
    }

    /// Send `request` under a fresh id and wait for the reply to that id
    pub fn send(&self, request: &Request) -> Result<Response> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = request.clone().with_id(id);

        for datagram in encode_request(&request, self.max_datagram_size)? {
            self.socket.send(&datagram)?;
        }
        self.receive(Some(id))
    }

    /// Send pre-encoded bytes and take the next reply, whatever its id
    pub fn send_raw(&self, datagram: &[u8]) -> Result<Response> {
        self.socket.send(datagram)?;
        self.receive(None)
    }

    /// Wait for a complete reply; with `expected`, drop replies to other ids
    fn receive(&self, expected: Option<u64>) -> Result<Response> {
        let deadline = Instant::now() + self.timeout;
        let reassembler = Reassembler::new(self.timeout, MAX_PENDING_REPLIES);
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out());
            }
            self.socket.set_read_timeout(Some(remaining))?;

            let len = match self.socket.recv(&mut buf) {
                Ok(len) => len,
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    return Err(self.timed_out());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            let frame = match decode_frame(&Bytes::copy_from_slice(&buf[..len])) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::debug!("Ignoring unreadable datagram: {}", e);
                    continue;
                }
            };
            if frame.kind != FrameKind::Response {
                continue;
            }
            if let Some(id) = expected {
                if frame.message_id != id {
                    tracing::debug!(
                        "Discarding reply to request #{} while waiting for #{}",
                        frame.message_id,
                        id
                    );
                    continue;
                }
            }

            if let Some(message) = reassembler.push(self.server_addr, frame)? {
                return decode_response(&message, self.local_addr);
            }
        }
    }

    fn timed_out(&self) -> BeingError {
        BeingError::Timeout(self.timeout.as_millis() as u64)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }
}
