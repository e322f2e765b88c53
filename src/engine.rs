//! Engine Module
//!
//! The core that coordinates the record store, the command registry and the
//! snapshot file.
//!
//! ## Responsibilities
//! - Load the snapshot on startup
//! - Route requests: `save_dump` / `get_dump` to the snapshot path,
//!   everything else to the command registry
//! - Persist the collection on close

use std::path::Path;

use crate::commands::{Caller, Context, Outcome, Registry};
use crate::config::Config;
use crate::error::{BeingError, Result};
use crate::protocol::{Request, Response, GET_DUMP, SAVE_DUMP};
use crate::snapshot::{self, SnapshotManager};
use crate::store::RecordStore;

/// The request-processing core
///
/// ## Concurrency Model
///
/// The engine is shared by every worker behind an `Arc` and only exposes
/// `&self` methods:
/// - **Record store**: one internal mutex; every operation, reads included,
///   is exclusive
/// - **Registry**: immutable after construction (history has its own lock)
/// - **Snapshot file**: written through a temp file + rename, so concurrent
///   saves never interleave bytes
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// The collection
    store: RecordStore,

    /// Name → command table
    registry: Registry,

    /// Snapshot file access
    snapshots: SnapshotManager,
}

impl Engine {
    /// Open an engine with the built-in commands
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Load the snapshot file if it exists
    /// 3. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        Self::with_registry(config, Registry::with_default_commands())
    }

    /// Open an engine with a custom command table
    pub fn with_registry(config: Config, registry: Registry) -> Result<Self> {
        config.validate()?;

        let snapshots = SnapshotManager::new(&config.snapshot_path);
        let store = RecordStore::with_lock_timeout(config.task_timeout());

        match snapshots.load() {
            Ok(Some(report)) => {
                tracing::info!(
                    "Loaded {} record(s) from {} ({} skipped)",
                    report.records.len(),
                    snapshots.path().display(),
                    report.skipped.len()
                );
                store.replace_all(report.records)?;
            }
            Ok(None) if config.require_snapshot => {
                return Err(BeingError::Snapshot(format!(
                    "snapshot file {} not found",
                    snapshots.path().display()
                )));
            }
            Ok(None) => {
                tracing::info!(
                    "No snapshot at {}, starting with an empty collection",
                    snapshots.path().display()
                );
            }
            Err(e) if config.require_snapshot => return Err(e),
            Err(e) => {
                // Keep the unreadable file out of the way so the next save
                // does not overwrite it
                let moved = snapshots.quarantine()?;
                tracing::error!(
                    "Could not load snapshot: {}. Moved it to {} and starting empty",
                    e,
                    moved.display()
                );
            }
        }

        Ok(Self {
            config,
            store,
            registry,
            snapshots,
        })
    }

    /// Execute a decoded request and build its response
    pub fn execute(&self, request: &Request) -> Response {
        let origin = request.origin;

        let response = match request.command.as_str() {
            SAVE_DUMP => {
                let outcome = self.save_dump(request.payload.as_deref());
                to_response(outcome, origin)
            }
            GET_DUMP => match self.get_dump() {
                Ok(xml) => Response::ok("Snapshot attached", origin).with_payload(xml),
                Err(e) => Response::error(format!("Failed to build snapshot: {}", e), origin),
            },
            name => {
                let outcome = self.run_command(Caller::Remote(origin), name, &request.args);
                to_response(outcome, origin)
            }
        };
        response.in_reply_to(request.id)
    }

    /// Run a registry command on behalf of `caller`
    pub fn run_command(&self, caller: Caller, name: &str, args: &[String]) -> Outcome {
        let mut ctx = Context::new(&self.store, &self.snapshots, &self.registry, caller);
        self.registry.execute(name, args, &mut ctx)
    }

    /// Replace the snapshot file and the collection with a client's snapshot.
    ///
    /// The document is decoded strictly; if any record is invalid nothing
    /// changes.
    pub fn save_dump(&self, payload: Option<&str>) -> Outcome {
        let xml = match payload {
            Some(xml) => xml,
            None => return Outcome::fail("save_dump requires a snapshot payload"),
        };

        let records = match snapshot::decode(xml) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Rejected snapshot from client: {}", e);
                return Outcome::fail(format!("Rejected snapshot: {}", e));
            }
        };

        let count = match self.snapshots.install(&self.store, records) {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("Failed to store client snapshot: {}", e);
                return Outcome::fail(format!("Failed to store snapshot: {}", e));
            }
        };

        tracing::info!("Stored client snapshot with {} record(s)", count);
        Outcome::ok(format!("Snapshot saved on the server ({} record(s))", count))
    }

    /// Encode the current collection
    pub fn get_dump(&self) -> Result<String> {
        Ok(snapshot::encode(&self.store.values()?))
    }

    /// Write the current collection to the snapshot file
    pub fn save(&self) -> Result<usize> {
        self.snapshots.save_store(&self.store)
    }

    /// Close the engine gracefully
    ///
    /// Persists the collection
    pub fn close(&self) -> Result<()> {
        let count = self.save()?;
        tracing::info!(
            "Persisted {} record(s) to {}",
            count,
            self.snapshots.path().display()
        );
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get the snapshot file path
    pub fn snapshot_path(&self) -> &Path {
        self.snapshots.path()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn to_response(outcome: Outcome, destination: std::net::SocketAddr) -> Response {
    if outcome.success {
        Response::ok(outcome.message, destination)
    } else {
        Response::error(outcome.message, destination)
    }
}
