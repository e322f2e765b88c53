//! Network Module
//!
//! UDP server for BeingKV.
//!
//! ## Architecture
//! - Single I/O thread polling the socket for readiness
//! - Read pool: decode + execute, one job per datagram
//! - Write pool: encode + send the response to the datagram's origin
//! - Commands routed through Engine

mod server;

pub use server::{Server, ShutdownHandle};
