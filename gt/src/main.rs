mod centroids;
mod config_args;
mod partition;
mod ui;

use std::process::ExitCode;

use centroids::{centroids, CentroidsArgs};
use clap::{Parser, Subcommand};
use partition::{partition, PartitionArgs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Balanced class grouping tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Partition the classes under <root>/train into groups for every candidate group size and
    /// write them to <root>/groupings.
    Partition(PartitionArgs),
    /// Estimate centroids for a single group size and report how classes distribute across them.
    Centroids(CentroidsArgs),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Partition(args) => partition(args),
        Commands::Centroids(args) => centroids(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
