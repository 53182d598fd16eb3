//! EmberKV CLI Client
//!
//! Command-line interface for interacting with EmberKV.

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use emberkv::network::Client;
use emberkv::Result;

/// EmberKV CLI
#[derive(Parser, Debug)]
#[command(name = "emberkv-cli")]
#[command(about = "CLI for EmberKV key-value store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Remove a key
    Rm {
        /// The key to remove
        key: String,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut client = Client::connect(&args.server)?;

    match &args.command {
        Commands::Get { key } => {
            let value = client.get(key.as_bytes())?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&value)?;
            stdout.write_all(b"\n")?;
        }
        Commands::Set { key, value } => client.set(key.as_bytes(), value.as_bytes())?,
        Commands::Rm { key } => client.remove(key.as_bytes())?,
    }

    Ok(())
}
