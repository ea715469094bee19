//! Configuration.
//!
//! Two layers:
//!
//! - [`ConfigFile`]: the on-disk INI file (`rust-ini`), covering store
//!   locations, logging and every tuning knob.
//! - [`CoverageConfig`]: the validated runtime options the pipeline consumes.
//!
//! `ConfigFile::coverage_config()` converts the first into the second; the
//! CLI then applies any flag overrides with the `with_*` builders.

mod file;
mod parser;
mod writer;

pub use file::{
    config_directory, config_file_path, ConfigFile, ConfigFileError, CoverageSettings,
    DestinationSettings, ErrorSettings, LoggingSettings, ProgressSettings, RunSettings,
    SinkSettings, SourceSettings, WorkerSettings, ZoomSettings, DEFAULT_DESTINATION_PATH,
    DEFAULT_LOG_DIRECTORY, DEFAULT_LOG_FILE, DEFAULT_SOURCE_PATH,
};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::coord::ZoomRange;
use crate::cover::Strategy;
use crate::scheduler::SchedulePolicy;
use crate::sink::DEFAULT_FLUSH_BATCH_SIZE;
use crate::telemetry::DEFAULT_PROGRESS_INTERVAL;

/// Default bound on queued work items.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Worker count used when available parallelism cannot be determined.
const FALLBACK_WORKER_COUNT: usize = 4;

/// Number of workers matching the machine's available parallelism.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_WORKER_COUNT)
}

/// What to do with a source row whose geometry cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DecodePolicy {
    /// Log the row and continue.
    #[default]
    Skip,
    /// Abort the run.
    Fail,
}

impl DecodePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            DecodePolicy::Skip => "skip",
            DecodePolicy::Fail => "fail",
        }
    }
}

impl fmt::Display for DecodePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DecodePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(DecodePolicy::Skip),
            "fail" => Ok(DecodePolicy::Fail),
            other => Err(format!(
                "unknown decode policy '{}', expected skip or fail",
                other
            )),
        }
    }
}

/// Invalid runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    ZeroWorkers,

    #[error("queue capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("flush batch size must be at least 1")]
    ZeroFlushBatchSize,
}

/// Runtime options for one coverage run.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageConfig {
    pub zooms: ZoomRange,
    pub strategy: Strategy,
    pub schedule: SchedulePolicy,
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub flush_batch_size: usize,
    pub decode_policy: DecodePolicy,
    /// Records between progress lines; 0 disables progress logging.
    pub progress_interval: u64,
    /// Run deadline; `None` runs to completion.
    pub deadline: Option<Duration>,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            zooms: ZoomRange::default(),
            strategy: Strategy::default(),
            schedule: SchedulePolicy::default(),
            worker_count: default_worker_count(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            flush_batch_size: DEFAULT_FLUSH_BATCH_SIZE,
            decode_policy: DecodePolicy::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            deadline: None,
        }
    }
}

impl CoverageConfig {
    pub fn with_zooms(mut self, zooms: ZoomRange) -> Self {
        self.zooms = zooms;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_schedule(mut self, schedule: SchedulePolicy) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_flush_batch_size(mut self, flush_batch_size: usize) -> Self {
        self.flush_batch_size = flush_batch_size;
        self
    }

    pub fn with_decode_policy(mut self, decode_policy: DecodePolicy) -> Self {
        self.decode_policy = decode_policy;
        self
    }

    pub fn with_progress_interval(mut self, progress_interval: u64) -> Self {
        self.progress_interval = progress_interval;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Checks the sizing options. Zoom bounds are enforced by [`ZoomRange`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.flush_batch_size == 0 {
            return Err(ConfigError::ZeroFlushBatchSize);
        }
        Ok(())
    }
}
