//! Covergen CLI - Command-line interface
//!
//! Builds a per-zoom tile coverage index from the polygons in a SQLite
//! store.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::init::InitArgs;
use commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "covergen")]
#[command(version, about = "Build a per-zoom tile coverage index from polygons", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cover every source polygon over the zoom range and write the index
    Run(RunArgs),
    /// Write a default configuration file
    Init(InitArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Init(args) => commands::init::run(args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
