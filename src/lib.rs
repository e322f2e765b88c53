//! # BeingKV
//!
//! A networked, concurrent store of `HumanBeing` records with:
//! - An in-memory keyed collection guarded by one lock
//! - XML snapshots, written atomically, loaded on startup
//! - A named command set shared by the network and scripts
//! - UDP request/response transport with CRC-checked frames
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      UDP Server                              │
//! │        (I/O thread → read pool → write pool)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │        (save_dump / get_dump │ command registry)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Commands   │─────────►│ RecordStore │
//!   │ (Registry)  │          │   (Mutex)   │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │  Snapshot   │
//!   │    (XML)    │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod model;
pub mod store;
pub mod snapshot;
pub mod commands;
pub mod protocol;
pub mod pool;
pub mod network;
pub mod engine;
pub mod lifecycle;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BeingError, Result};
pub use config::Config;
pub use engine::Engine;
pub use lifecycle::Lifecycle;
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of BeingKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
