//! BeingKV CLI Client
//!
//! Command-line interface for interacting with a BeingKV server.

use std::io::{BufRead, Write};
use std::time::Duration;

use beingkv::protocol::Response;
use beingkv::{Client, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// BeingKV CLI
#[derive(Parser, Debug)]
#[command(name = "beingkv-cli")]
#[command(about = "CLI for the BeingKV record store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:1448")]
    server: String,

    /// How long to wait for each reply in milliseconds
    #[arg(short, long, default_value = "3000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one command, e.g. `exec insert 5 name=Ann x=1 ...`
    Exec {
        /// Command name
        command: String,

        /// Arguments passed as-is
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Download the server's collection into an XML file
    Pull {
        /// Destination file
        file: String,
    },

    /// Replace the server's collection with an XML file
    Push {
        /// Source file
        file: String,
    },

    /// Read commands from stdin, one per line (default)
    Shell,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let client = match Client::connect(&args.server, Duration::from_millis(args.timeout_ms)) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to reach {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let result = match args.command.unwrap_or(Commands::Shell) {
        Commands::Exec { command, args } => client.execute(&command, &args).map(print_response),
        Commands::Pull { file } => pull(&client, &file),
        Commands::Push { file } => push(&client, &file),
        Commands::Shell => shell(&client),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a response; returns its success flag
fn print_response(response: Response) -> bool {
    if response.success {
        println!("{}", response.message);
    } else {
        eprintln!("{}", response.message);
    }
    response.success
}

fn pull(client: &Client, file: &str) -> Result<bool> {
    let xml = client.get_dump()?;
    std::fs::write(file, xml)?;
    println!("Snapshot written to {}", file);
    Ok(true)
}

fn push(client: &Client, file: &str) -> Result<bool> {
    let xml = std::fs::read_to_string(file)?;
    Ok(print_response(client.save_dump(&xml)?))
}

fn shell(client: &Client) -> Result<bool> {
    println!("Connected to {}. Type 'help' for commands, 'exit' to quit.", client.server_addr());

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => return Ok(true),
        };
        let line = line.trim();
        if line == "exit" {
            return Ok(true);
        }

        // A lost datagram or slow server should not end the session
        match client.execute_line(line) {
            Ok(Some(response)) => {
                print_response(response);
            }
            Ok(None) => {}
            Err(e) => eprintln!("Error: {}", e),
        }
    }
}
