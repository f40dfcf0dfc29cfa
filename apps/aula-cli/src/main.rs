//! aula CLI - entry point for the synchronization job.
//!
//! Intended for periodic invocation (cron): `aula sync` runs one full pass
//! and exits 0 when no errors were counted, 1 otherwise.

use clap::{Parser, Subcommand};

mod logging;

use aula_sync::{SyncConfig, SyncJob};

/// aula platform synchronization
#[derive(Parser)]
#[command(name = "aula")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full synchronization pass
    Sync,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Fail fast on missing configuration, before logging is even up.
    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.log_filter);

    match cli.command {
        Commands::Sync => {
            let summary = SyncJob::new(config).execute().await;
            std::process::exit(i32::from(!summary.is_success()));
        }
    }
}
