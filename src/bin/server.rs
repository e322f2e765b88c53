//! BeingKV Server Binary
//!
//! Starts the UDP server and the operator console.

use std::io::BufRead;
use std::thread;
use std::time::Duration;

use beingkv::{Config, Lifecycle};
use clap::Parser;
use crossbeam::channel::{self, RecvTimeoutError};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing_subscriber::{fmt, EnvFilter};

/// How often the console loop checks for a shutdown requested elsewhere
const CONSOLE_TICK: Duration = Duration::from_millis(200);

/// BeingKV Server
#[derive(Parser, Debug)]
#[command(name = "beingkv-server")]
#[command(about = "Networked store of HumanBeing records")]
#[command(version)]
struct Args {
    /// XML snapshot file
    #[arg(short, long, default_value = "./humanbeings.xml")]
    snapshot: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:1448")]
    listen: String,

    /// Threads executing requests
    #[arg(short, long, default_value = "4")]
    read_workers: usize,

    /// Threads sending responses
    #[arg(short, long, default_value = "2")]
    write_workers: usize,

    /// Pending jobs per pool before backpressure
    #[arg(short, long, default_value = "256")]
    queue_capacity: usize,

    /// Store lock timeout and slow-task threshold in milliseconds
    #[arg(short, long, default_value = "5000")]
    task_timeout_ms: u64,

    /// Refuse to start without a readable snapshot file
    #[arg(long)]
    require_snapshot: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,beingkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("BeingKV Server v{}", beingkv::VERSION);
    tracing::info!("Snapshot file: {}", args.snapshot);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .snapshot_path(&args.snapshot)
        .listen_addr(&args.listen)
        .read_workers(args.read_workers)
        .write_workers(args.write_workers)
        .queue_capacity(args.queue_capacity)
        .task_timeout_ms(args.task_timeout_ms)
        .require_snapshot(args.require_snapshot)
        .build();

    let lifecycle = match Lifecycle::start(config) {
        Ok(lifecycle) => lifecycle,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // SIGINT / SIGTERM
    let shutdown = lifecycle.shutdown_handle();
    match Signals::new([SIGINT, SIGTERM]) {
        Ok(mut signals) => {
            thread::spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    tracing::info!("Received signal {}, initiating shutdown...", signal);
                    shutdown.shutdown();
                }
            });
        }
        Err(e) => tracing::warn!("Signal handlers unavailable: {}", e),
    }

    run_console(&lifecycle);

    if let Err(e) = lifecycle.stop() {
        tracing::error!("Shutdown failed: {}", e);
        std::process::exit(1);
    }
}

/// Serve operator commands from stdin until shutdown; EOF counts as `exit`
fn run_console(lifecycle: &Lifecycle) {
    let (lines_tx, lines_rx) = channel::unbounded::<String>();

    // stdin blocks, so it gets its own thread; it dies with the process
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if lines_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    let shutdown = lifecycle.shutdown_handle();
    println!("Console ready. Commands: exit, save");

    while !shutdown.is_shutdown() {
        match lines_rx.recv_timeout(CONSOLE_TICK) {
            Ok(line) => {
                if let Some(outcome) = lifecycle.handle_console_line(&line) {
                    println!("{}", outcome);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::info!("Console closed, initiating shutdown...");
                shutdown.shutdown();
            }
        }
    }
}
