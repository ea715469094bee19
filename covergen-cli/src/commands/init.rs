//! Init command - write a default configuration file.

use std::path::PathBuf;

use clap::Args;
use covergen::config::ConfigFile;

use super::common::resolve_config_path;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Where to write the file (default: ~/.covergen/config.ini)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Run the init command.
pub fn run(args: InitArgs) -> Result<(), CliError> {
    let path = resolve_config_path(args.path.as_deref());
    if path.exists() && !args.force {
        return Err(CliError::ConfigExists(path));
    }

    ConfigFile::default().save_to(&path)?;

    println!("Configuration file: {}", path.display());
    println!();
    println!("Edit this file to point [source] and [destination] at your stores.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}
