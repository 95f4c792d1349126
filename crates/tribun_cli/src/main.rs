//! Tribun CLI
//!
//! Command-line tool managing configuration stored in a Consul-compatible
//! key/value store.
//!
//! # Commands
//!
//! - `get` - Print the stored values of a key file
//! - `put` - Write a key file, refusing to overwrite non-alterable keys
//! - `delete` - Delete the keys of a key file
//! - `revision` - List, apply, roll back or create revisions

mod client;
mod commands;

use clap::{Parser, Subcommand};
use client::ReqwestClient;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tribun_core::{ConfigStore, RevisionId};
use tribun_store::{HttpStore, StoreConfig, DEFAULT_ADDRESS};

/// Tribun configuration management.
#[derive(Parser)]
#[command(name = "tribun")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address of the store agent
    #[arg(global = true, long, env = "CONSUL_HTTP_ADDR", default_value = DEFAULT_ADDRESS)]
    address: String,

    /// ACL token sent with every request
    #[arg(global = true, long, env = "CONSUL_HTTP_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Datacenter to target instead of the agent's own
    #[arg(global = true, long)]
    datacenter: Option<String>,

    /// Request timeout in seconds
    #[arg(global = true, long, default_value = "30")]
    timeout: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stored values of the keys in a file
    Get {
        /// JSON file holding a list of keys
        file: PathBuf,

        /// Fail if a key does not exist
        #[arg(long)]
        strict: bool,
    },

    /// Write the keys in a file
    Put {
        /// JSON file holding a list of keys
        file: PathBuf,
    },

    /// Delete the keys in a file
    Delete {
        /// JSON file holding a list of keys
        file: PathBuf,
    },

    /// Manage revisions
    #[command(subcommand)]
    Revision(RevisionCommands),

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum RevisionCommands {
    /// Print the revision chain
    List {
        /// Directory holding revision files
        dir: PathBuf,
    },

    /// Apply revisions
    Upgrade {
        /// Directory holding revision files
        dir: PathBuf,

        /// Last revision to apply
        #[arg(long)]
        to: Option<RevisionId>,
    },

    /// Roll back revisions
    Downgrade {
        /// Directory holding revision files
        dir: PathBuf,

        /// Revision to stop at, it stays applied
        #[arg(long)]
        to: Option<RevisionId>,
    },

    /// Create an empty revision file
    New {
        /// Directory holding revision files
        dir: PathBuf,

        /// Short description, used in the file name
        description: String,

        /// Revision to follow, defaults to the current head
        #[arg(long)]
        down: Option<RevisionId>,
    },
}

impl Cli {
    fn connect(&self) -> Result<ConfigStore<HttpStore<ReqwestClient>>, Box<dyn std::error::Error>> {
        let mut config =
            StoreConfig::new(&self.address).with_timeout(Duration::from_secs(self.timeout));
        if let Some(token) = &self.token {
            config = config.with_token(token);
        }
        if let Some(datacenter) = &self.datacenter {
            config = config.with_datacenter(datacenter);
        }
        config.validate()?;

        let client = ReqwestClient::new(config.timeout)?;
        Ok(ConfigStore::new(HttpStore::new(config, client)))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
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

    match &cli.command {
        Commands::Get { file, strict } => {
            commands::keys::get(&cli.connect()?, file, *strict)?;
        }
        Commands::Put { file } => {
            commands::keys::put(&cli.connect()?, file)?;
        }
        Commands::Delete { file } => {
            commands::keys::delete(&cli.connect()?, file)?;
        }
        Commands::Revision(command) => match command {
            RevisionCommands::List { dir } => {
                commands::revision::list(dir)?;
            }
            RevisionCommands::Upgrade { dir, to } => {
                commands::revision::upgrade(&cli.connect()?, dir, to.as_ref())?;
            }
            RevisionCommands::Downgrade { dir, to } => {
                commands::revision::downgrade(&cli.connect()?, dir, to.as_ref())?;
            }
            RevisionCommands::New {
                dir,
                description,
                down,
            } => {
                commands::revision::new(dir, description, down.clone())?;
            }
        },
        Commands::Version => {
            println!("Tribun CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Tribun Core v{}", tribun_core::VERSION);
        }
    }

    Ok(())
}
