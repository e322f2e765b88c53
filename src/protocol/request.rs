//! Request envelope
//!
//! Represents one command sent by a client.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Command names handled by the snapshot path instead of the registry
pub const SAVE_DUMP: &str = "save_dump";
pub const GET_DUMP: &str = "get_dump";

/// A decoded request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Client-chosen id, echoed by the response
    pub id: u64,

    /// Command name, looked up in the registry
    pub command: String,

    /// Argument tokens
    pub args: Vec<String>,

    /// Snapshot document (only `save_dump` carries one)
    pub payload: Option<String>,

    /// Where the response goes
    pub origin: SocketAddr,
}

impl Request {
    pub fn new(command: impl Into<String>, args: Vec<String>, origin: SocketAddr) -> Self {
        Self {
            id: 0,
            command: command.into(),
            args,
            payload: None,
            origin,
        }
    }

    /// Split a console-style line into command name and argument tokens
    pub fn parse_line(line: &str, origin: SocketAddr) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let command = tokens.next()?;
        Some(Self::new(command, tokens.map(str::to_string).collect(), origin))
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn is_persistence(&self) -> bool {
        self.command == SAVE_DUMP || self.command == GET_DUMP
    }
}

/// The part of a request that travels in the datagram body
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RequestBody {
    pub command: String,
    pub args: Vec<String>,
    pub payload: Option<String>,
}
