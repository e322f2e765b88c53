//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (V2 - Fragmented datagrams)
//!
//! Each request and each response is a message split into one or more
//! UDP datagrams:
//! ```text
//! ┌──────────┬────────┬───────────┬───────────┬─────────┬─────────┬─────────┐
//! │ Kind (1) │ Id (8) │ Index (2) │ Count (2) │ Len (4) │ CRC (4) │  Chunk  │
//! └──────────┴────────┴───────────┴───────────┴─────────┴─────────┴─────────┘
//! ```
//!
//! The chunks of a message, in index order, form its bincode body.
//!
//! ### Request body
//! - command name (e.g. `insert`, `show`, `save_dump`)
//! - argument tokens
//! - optional snapshot payload
//!
//! ### Response body
//! - success flag
//! - message
//! - optional snapshot payload
//!
//! The origin of a request is the datagram's source address; it is never
//! part of the body. A response carries the id of its request, so a client
//! can drop replies that arrive after it stopped waiting.

mod codec;
mod reassembly;
mod request;
mod response;

pub use codec::{
    decode_frame, decode_request, decode_response, encode_request, encode_response,
    peek_message_id, Frame, FrameKind, HEADER_SIZE, MAX_CHUNK_SIZE, MAX_FRAGMENTS,
};
pub use reassembly::{Message, Reassembler};
pub use request::{Request, GET_DUMP, SAVE_DUMP};
pub use response::Response;
