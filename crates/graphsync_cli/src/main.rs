//! graphsync CLI
//!
//! Command-line tools for running a hub and working with its state.
//!
//! # Commands
//!
//! - `serve` - Run a hub until interrupted
//! - `dump` - Print the hub's current state
//! - `add` / `set` / `remove` - Submit a change-set and wait for the hub to echo it
//! - `watch` - Print every change-set the hub broadcasts

mod commands;

use clap::{Parser, Subcommand};
use graphsync_client::ClientConfig;
use graphsync_hub::{HubConfig, DEFAULT_PORT};
use graphsync_protocol::ChangeSet;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Replicated object-graph tools.
#[derive(Parser)]
#[command(name = "graphsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Hub address to connect to
    #[arg(global = true, short, long, default_value_t = default_addr())]
    server: SocketAddr,

    /// Seconds to wait for the connection and for confirmations
    #[arg(global = true, short, long, default_value = "10")]
    timeout: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a hub until Ctrl-C
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value_t = default_addr())]
        bind: SocketAddr,

        /// Maximum number of connected replicas
        #[arg(long, default_value = "1000")]
        max_replicas: usize,
    },

    /// Print the hub's current state
    Dump {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Add entities
    Add {
        /// Keys to add
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Set one property
    Set {
        /// Entity key
        key: String,

        /// Property name
        property: String,

        /// New value as JSON (e.g. true, 42, "text", [1, 2])
        value: String,
    },

    /// Remove entities
    Remove {
        /// Keys to remove
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Print every change-set the hub broadcasts
    Watch {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let timeout = Duration::from_secs(cli.timeout);
    let client = ClientConfig::new(cli.server).with_connect_timeout(timeout);

    match cli.command {
        Commands::Serve { bind, max_replicas } => {
            let config = HubConfig::new(bind).with_max_replicas(max_replicas);
            commands::serve::run(config).await?;
        }
        Commands::Dump { format } => {
            commands::dump::run(client, timeout, &format).await?;
        }
        Commands::Add { keys } => {
            let change_set = keys
                .into_iter()
                .fold(ChangeSet::new(), |set, key| set.with_add(key));
            commands::mutate::run(client, change_set, timeout).await?;
        }
        Commands::Set {
            key,
            property,
            value,
        } => {
            let value = commands::parse_value(&value)?;
            let change_set = ChangeSet::new().with_change(key, property, value);
            commands::mutate::run(client, change_set, timeout).await?;
        }
        Commands::Remove { keys } => {
            let change_set = keys
                .into_iter()
                .fold(ChangeSet::new(), |set, key| set.with_remove(key));
            commands::mutate::run(client, change_set, timeout).await?;
        }
        Commands::Watch { format } => {
            commands::watch::run(client, timeout, &format).await?;
        }
        Commands::Version => {
            println!("graphsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_set_with_global_flags() {
        let cli = Cli::try_parse_from([
            "graphsync",
            "set",
            "t1",
            "completed",
            "true",
            "--server",
            "127.0.0.1:9000",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.server.port(), 9000);
        assert!(cli.verbose);
        assert_eq!(cli.timeout, 10);
        match cli.command {
            Commands::Set {
                key,
                property,
                value,
            } => {
                assert_eq!((key.as_str(), property.as_str(), value.as_str()), ("t1", "completed", "true"));
            }
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn add_requires_a_key() {
        assert!(Cli::try_parse_from(["graphsync", "add"]).is_err());
    }

    #[test]
    fn serve_defaults_to_hub_port() {
        let cli = Cli::try_parse_from(["graphsync", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { bind, max_replicas } => {
                assert_eq!(bind.port(), DEFAULT_PORT);
                assert_eq!(max_replicas, 1000);
            }
            _ => panic!("expected serve"),
        }
    }
}
