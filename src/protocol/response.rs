//! Response envelope
//!
//! Represents responses to clients.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// A response to send to a client
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Id of the request this answers; 0 when it could not be read
    pub request_id: u64,

    /// Human-readable result text
    pub message: String,

    /// Whether the command succeeded
    pub success: bool,

    /// Snapshot document (only `get_dump` replies carry one)
    pub payload: Option<String>,

    /// Address of the client that sent the request
    pub destination: SocketAddr,
}

impl Response {
    /// Create a successful response
    pub fn ok(message: impl Into<String>, destination: SocketAddr) -> Self {
        Self {
            request_id: 0,
            message: message.into(),
            success: true,
            payload: None,
            destination,
        }
    }

    /// Create a failure response
    pub fn error(message: impl Into<String>, destination: SocketAddr) -> Self {
        Self {
            request_id: 0,
            message: message.into(),
            success: false,
            payload: None,
            destination,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn in_reply_to(mut self, request_id: u64) -> Self {
        self.request_id = request_id;
        self
    }
}

/// The part of a response that travels in the datagram body
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ResponseBody {
    pub success: bool,
    pub message: String,
    pub payload: Option<String>,
}
