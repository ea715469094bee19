//! CLI error handling with user-friendly messages.

use std::fmt;
use std::path::PathBuf;
use std::process;

use covergen::config::ConfigFileError;
use covergen::error::SetupError;
use covergen::pipeline::RunError;

/// Exit status used when the run is interrupted.
const EXIT_INTERRUPTED: i32 = 130;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be read, parsed or written
    Config(ConfigFileError),
    /// Config file already exists and `--force` was not given
    ConfigExists(PathBuf),
    /// Source or destination store could not be prepared
    Setup(SetupError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Failed to install the Ctrl-C handler
    Signal(String),
    /// The coverage run failed
    Run(RunError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Setup(SetupError::Open { .. }) | CliError::Run(RunError::Setup(_)) => {
                eprintln!();
                eprintln!("Check that:");
                eprintln!("  1. The source database exists and is readable");
                eprintln!("  2. The destination directory is writable");
                eprintln!("  3. [source] query returns (id, WKB geometry) rows");
            }
            CliError::ConfigExists(_) => {
                eprintln!("Use --force to overwrite it.");
            }
            CliError::Run(RunError::Cancelled) => process::exit(EXIT_INTERRUPTED),
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::ConfigExists(path) => {
                write!(f, "Configuration file already exists: {}", path.display())
            }
            CliError::Setup(e) => write!(f, "Setup failed: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Signal(msg) => write!(f, "Failed to set signal handler: {}", msg),
            CliError::Run(e) => write!(f, "Coverage run failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Setup(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Run(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<SetupError> for CliError {
    fn from(e: SetupError) -> Self {
        CliError::Setup(e)
    }
}

impl From<RunError> for CliError {
    fn from(e: RunError) -> Self {
        CliError::Run(e)
    }
}
