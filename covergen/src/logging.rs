//! Logging setup.
//!
//! Installs a `tracing` subscriber that writes to a log file (cleared at the
//! start of every run) and optionally to stdout. The level defaults to
//! `info` and follows `RUST_LOG` when set.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    path: PathBuf,
}

impl LoggingGuard {
    /// Path of the active log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Initialize logging.
///
/// Creates `log_dir` if needed, truncates `log_file`, and installs the global
/// subscriber. With `stdout` set, events are also printed to the terminal.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot be
/// cleared.
pub fn init_logging(log_dir: &Path, log_file: &str, stdout: bool) -> io::Result<LoggingGuard> {
    let path = prepare_log_file(log_dir, log_file)?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(false);

    let stdout_layer = stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_target(false)
            .compact()
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
        path,
    })
}

/// Creates the log directory and clears the log file.
fn prepare_log_file(log_dir: &Path, log_file: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(log_file);
    fs::write(&path, "")?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // init_logging installs a global subscriber, so only file preparation is tested.

    #[test]
    fn test_creates_directory_and_file() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");

        let path = prepare_log_file(&log_dir, "covergen.log").unwrap();

        assert!(log_dir.is_dir());
        assert_eq!(path, log_dir.join("covergen.log"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_clears_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("covergen.log");
        fs::write(&path, "previous run").unwrap();

        prepare_log_file(dir.path(), "covergen.log").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
