//! Commands Module
//!
//! The named operations clients and the operator can run.
//!
//! ## Responsibilities
//! - Name → handler lookup, frozen once the server starts (`Registry`)
//! - Argument validation inside each handler
//! - Turning every failure into an `Outcome` with `success = false`
//!
//! ## Shape
//! ```text
//! Registry::execute(name, args, ctx)
//!     │
//!     ├── unknown name ──────────────► Outcome { success: false }
//!     └── Command::execute(args, ctx)
//!             ├── Ok(outcome) ──────► outcome
//!             └── Err(BeingError) ──► Outcome { success: false, message }
//! ```

mod collection;
mod mutation;
mod persistence;
mod registry;
mod session;

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{BeingError, Result};
use crate::model::{Key, RecordDraft};
use crate::snapshot::SnapshotManager;
use crate::store::RecordStore;

pub use registry::{Registry, HISTORY_LIMIT};

/// Something a command asks its caller to do after it returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    Shutdown,
}

/// Result of running one command
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
    pub effect: Effect,
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            effect: Effect::None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            effect: Effect::None,
        }
    }

    pub fn shutdown(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            effect: Effect::Shutdown,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Who issued a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// The operator console of the server process
    Console,

    /// A network client
    Remote(SocketAddr),
}

/// Everything a command may touch while it runs
pub struct Context<'a> {
    pub store: &'a RecordStore,
    pub snapshots: &'a SnapshotManager,
    pub registry: &'a Registry,
    pub caller: Caller,

    /// Scripts currently executing, outermost first
    script_stack: Vec<PathBuf>,
}

impl<'a> Context<'a> {
    pub fn new(
        store: &'a RecordStore,
        snapshots: &'a SnapshotManager,
        registry: &'a Registry,
        caller: Caller,
    ) -> Self {
        Self {
            store,
            snapshots,
            registry,
            caller,
            script_stack: Vec::new(),
        }
    }
}

/// A named operation
pub trait Command: Send + Sync {
    /// Name used for lookup
    fn name(&self) -> &'static str;

    /// Usage line shown by `help` and in argument errors
    fn usage(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Run the command. Errors become failure outcomes in the registry.
    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome>;
}

// =============================================================================
// Argument Helpers
// =============================================================================

fn usage_error(command: &dyn Command) -> BeingError {
    BeingError::Usage(format!(
        "Wrong number of arguments\nUsage: '{}'",
        command.usage()
    ))
}

fn expect_no_args(command: &dyn Command, args: &[String]) -> Result<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(usage_error(command))
    }
}

fn parse_key(command: &dyn Command, args: &[String]) -> Result<Key> {
    let raw = args.first().ok_or_else(|| usage_error(command))?;
    match raw.parse::<Key>() {
        Ok(key) if key > 0 => Ok(key),
        _ => Err(BeingError::Validation(format!(
            "key must be a positive integer (got '{}')",
            raw
        ))),
    }
}

fn parse_draft(command: &dyn Command, tokens: &[String]) -> Result<RecordDraft> {
    if tokens.is_empty() {
        return Err(usage_error(command));
    }
    RecordDraft::from_tokens(tokens)
}
