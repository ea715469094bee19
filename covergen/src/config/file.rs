//! The INI configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::{default_worker_count, CoverageConfig, DecodePolicy, DEFAULT_QUEUE_CAPACITY};
use crate::coord::{ZoomRange, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM};
use crate::cover::Strategy;
use crate::scheduler::SchedulePolicy;
use crate::sink::{DEFAULT_COVERAGE_TABLE, DEFAULT_FLUSH_BATCH_SIZE};
use crate::source::DEFAULT_SOURCE_QUERY;
use crate::telemetry::DEFAULT_PROGRESS_INTERVAL;

pub const DEFAULT_SOURCE_PATH: &str = "db/spatial.db";
pub const DEFAULT_DESTINATION_PATH: &str = "db/out.db";
pub const DEFAULT_LOG_DIRECTORY: &str = "logs";
pub const DEFAULT_LOG_FILE: &str = "covergen.log";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

/// `[source]`
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub path: PathBuf,
    pub query: String,
}

/// `[destination]`
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationSettings {
    pub path: PathBuf,
    pub table: String,
}

/// `[zoom]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomSettings {
    pub min: u8,
    pub max: u8,
}

/// `[coverage]`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoverageSettings {
    pub strategy: Strategy,
    pub schedule: SchedulePolicy,
}

/// `[workers]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerSettings {
    /// `None` sizes the pool to available parallelism.
    pub count: Option<usize>,
    pub queue_capacity: usize,
}

/// `[sink]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkSettings {
    pub flush_batch_size: usize,
}

/// `[errors]`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ErrorSettings {
    pub decode_policy: DecodePolicy,
}

/// `[progress]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSettings {
    pub interval: u64,
}

/// `[run]`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunSettings {
    pub timeout_secs: Option<u64>,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

/// The complete configuration file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub source: SourceSettings,
    pub destination: DestinationSettings,
    pub zoom: ZoomSettings,
    pub coverage: CoverageSettings,
    pub workers: WorkerSettings,
    pub sink: SinkSettings,
    pub errors: ErrorSettings,
    pub progress: ProgressSettings,
    pub run: RunSettings,
    pub logging: LoggingSettings,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SOURCE_PATH),
            query: DEFAULT_SOURCE_QUERY.to_string(),
        }
    }
}

impl Default for DestinationSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DESTINATION_PATH),
            table: DEFAULT_COVERAGE_TABLE.to_string(),
        }
    }
}

impl Default for ZoomSettings {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_ZOOM,
            max: DEFAULT_MAX_ZOOM,
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            count: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            flush_batch_size: DEFAULT_FLUSH_BATCH_SIZE,
        }
    }
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_LOG_DIRECTORY),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl ConfigFile {
    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigFileError> {
        let ini =
            Ini::load_from_str(content).map_err(|e| ConfigFileError::ReadError(ini::Error::Parse(e)))?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Build the runtime configuration.
    pub fn coverage_config(&self) -> Result<CoverageConfig, ConfigFileError> {
        let zooms = ZoomRange::new(self.zoom.min, self.zoom.max).map_err(|e| {
            ConfigFileError::InvalidValue {
                section: "zoom".to_string(),
                key: "min/max".to_string(),
                value: format!("{}..{}", self.zoom.min, self.zoom.max),
                reason: e.to_string(),
            }
        })?;

        Ok(CoverageConfig {
            zooms,
            strategy: self.coverage.strategy,
            schedule: self.coverage.schedule,
            worker_count: self.workers.count.unwrap_or_else(default_worker_count),
            queue_capacity: self.workers.queue_capacity,
            flush_batch_size: self.sink.flush_batch_size,
            decode_policy: self.errors.decode_policy,
            progress_interval: self.progress.interval,
            deadline: self.run.timeout_secs.map(Duration::from_secs),
        })
    }

    /// Full path of the log file.
    pub fn log_file_path(&self) -> PathBuf {
        self.logging.directory.join(&self.logging.file)
    }
}

/// Get the path to the config directory (~/.covergen).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".covergen")
}

/// Get the path to the config file (~/.covergen/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
