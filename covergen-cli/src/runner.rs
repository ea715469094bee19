//! CLI runner for common setup.
//!
//! Owns the logging guard and the resolved configuration for the lifetime of
//! a command.

use tokio::runtime::Runtime;
use tracing::info;

use covergen::config::ConfigFile;
use covergen::logging::{init_logging, LoggingGuard};

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Initializes logging from the `[logging]` section of `config`.
    pub fn new(config: ConfigFile, stdout_logging: bool) -> Result<Self, CliError> {
        let logging_guard = init_logging(
            &config.logging.directory,
            &config.logging.file,
            stdout_logging,
        )
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("Covergen v{}", covergen::VERSION);
        info!(
            log_file = %self.logging_guard.path().display(),
            "Covergen CLI: {} command", command
        );
    }

    /// Builds the multi-threaded runtime the pipeline runs on.
    pub fn runtime(&self) -> Result<Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("covergen")
            .build()
            .map_err(CliError::Runtime)
    }
}
