//! Lifecycle Controller
//!
//! Startup and shutdown of a whole server process.
//!
//! ## Startup
//! 1. `Engine::open` loads the snapshot
//! 2. `Server::bind` binds the UDP socket
//! 3. The I/O thread starts serving
//!
//! ## Shutdown
//! 1. The shutdown handle stops the I/O loop
//! 2. The I/O thread drains both worker pools before it exits
//! 3. The collection is written to the snapshot file

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::commands::{Caller, Effect, Outcome};
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{BeingError, Result};
use crate::network::{Server, ShutdownHandle};

/// Commands the operator console accepts
const CONSOLE_COMMANDS: [&str; 2] = ["exit", "save"];

/// A running server
pub struct Lifecycle {
    engine: Arc<Engine>,
    shutdown: ShutdownHandle,
    local_addr: SocketAddr,
    io_thread: JoinHandle<Result<()>>,
}

impl Lifecycle {
    /// Load the snapshot, bind the socket, and start serving
    pub fn start(config: Config) -> Result<Self> {
        let engine = Arc::new(Engine::open(config.clone())?);
        tracing::info!("Engine ready with {} record(s)", engine.store().len()?);

        let mut server = Server::bind(config, Arc::clone(&engine))?;
        let shutdown = server.shutdown_handle();
        let local_addr = server.local_addr();

        let io_thread = thread::Builder::new()
            .name("beingkv-io".to_string())
            .spawn(move || server.run())?;

        Ok(Self {
            engine,
            shutdown,
            local_addr,
            io_thread,
        })
    }

    /// Handle one line typed at the operator console.
    ///
    /// Returns `None` for a blank line. `exit` also signals shutdown.
    pub fn handle_console_line(&self, line: &str) -> Option<Outcome> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next()?;
        let args: Vec<String> = tokens.map(str::to_string).collect();

        if !CONSOLE_COMMANDS.contains(&name) {
            return Some(Outcome::fail(format!(
                "Unknown console command '{}'. Available: {}",
                name,
                CONSOLE_COMMANDS.join(", ")
            )));
        }

        let outcome = self.engine.run_command(Caller::Console, name, &args);
        if outcome.effect == Effect::Shutdown {
            tracing::info!("Shutdown requested from the console");
            self.shutdown.shutdown();
        }
        Some(outcome)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Stop serving, wait for in-flight work, and persist the collection
    pub fn stop(self) -> Result<()> {
        self.shutdown.shutdown();

        let served = match self.io_thread.join() {
            Ok(served) => served,
            Err(_) => Err(BeingError::Pool("I/O thread panicked".to_string())),
        };
        if let Err(e) = &served {
            tracing::error!("I/O loop failed: {}", e);
        }

        // Persist even if the loop failed
        self.engine.close()?;
        tracing::info!("Server stopped");
        served
    }
}
