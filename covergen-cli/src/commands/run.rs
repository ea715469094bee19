//! Run command - build the coverage index.
//!
//! Resolves the configuration (config file, then CLI overrides), opens the
//! source and destination stores and drives the pipeline to completion.

use std::path::PathBuf;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use covergen::config::ConfigFile;
use covergen::pipeline::{CoveragePipeline, RunSummary};
use covergen::sink::SqliteCoverageStore;
use covergen::source::SqliteSource;

use super::common::{load_config, DecodePolicyArg, ScheduleArg, StrategyArg};
use crate::error::CliError;
use crate::runner::CliRunner;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Config file (default: ~/.covergen/config.ini)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Spatial database holding the source geometries
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Query returning (id, WKB geometry) rows
    #[arg(long)]
    pub query: Option<String>,

    /// Database the coverage index is written to
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Destination table name
    #[arg(long)]
    pub table: Option<String>,

    /// Lowest zoom level to index
    #[arg(long)]
    pub min_zoom: Option<u8>,

    /// Highest zoom level to index
    #[arg(long)]
    pub max_zoom: Option<u8>,

    /// Tile coverage strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// How zoom levels are scheduled across workers
    #[arg(long, value_enum)]
    pub schedule: Option<ScheduleArg>,

    /// Number of coverage workers (default: number of CPUs)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Bound of the queue between the reader and the workers
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Records buffered before a batch is written
    #[arg(long)]
    pub flush_batch_size: Option<usize>,

    /// What to do with rows whose geometry cannot be decoded
    #[arg(long, value_enum)]
    pub decode_policy: Option<DecodePolicyArg>,

    /// Abort the run after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Log progress every N records (0 disables)
    #[arg(long)]
    pub progress_interval: Option<u64>,

    /// Log to the file only
    #[arg(long, short)]
    pub quiet: bool,
}

impl RunArgs {
    /// Applies CLI overrides on top of the config file values.
    pub fn apply_to(&self, config: &mut ConfigFile) {
        if let Some(ref path) = self.source {
            config.source.path = path.clone();
        }
        if let Some(ref query) = self.query {
            config.source.query = query.clone();
        }
        if let Some(ref path) = self.dest {
            config.destination.path = path.clone();
        }
        if let Some(ref table) = self.table {
            config.destination.table = table.clone();
        }
        if let Some(min) = self.min_zoom {
            config.zoom.min = min;
        }
        if let Some(max) = self.max_zoom {
            config.zoom.max = max;
        }
        if let Some(strategy) = self.strategy {
            config.coverage.strategy = strategy.into();
        }
        if let Some(schedule) = self.schedule {
            config.coverage.schedule = schedule.into();
        }
        if let Some(count) = self.workers {
            config.workers.count = Some(count);
        }
        if let Some(capacity) = self.queue_capacity {
            config.workers.queue_capacity = capacity;
        }
        if let Some(size) = self.flush_batch_size {
            config.sink.flush_batch_size = size;
        }
        if let Some(policy) = self.decode_policy {
            config.errors.decode_policy = policy.into();
        }
        if let Some(secs) = self.timeout {
            config.run.timeout_secs = Some(secs);
        }
        if let Some(interval) = self.progress_interval {
            config.progress.interval = interval;
        }
    }
}

/// Run the coverage build.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let mut file = load_config(args.config.as_deref())?;
    args.apply_to(&mut file);

    let runner = CliRunner::new(file, !args.quiet)?;
    runner.log_startup("run");

    let file = runner.config();
    let config = file.coverage_config()?;

    info!(
        source = %file.source.path.display(),
        destination = %file.destination.path.display(),
        table = %file.destination.table,
        "Opening stores"
    );
    let source = SqliteSource::open(&file.source.path, file.source.query.clone())?;
    let store = SqliteCoverageStore::open(&file.destination.path, file.destination.table.clone())?;
    let pipeline = CoveragePipeline::new(config, store)?;

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, cancelling run");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Signal(e.to_string()))?;

    let runtime = runner.runtime()?;
    let summary = runtime.block_on(pipeline.run(source, &cancel))?;

    print_summary(&summary, file);
    Ok(())
}

fn print_summary(summary: &RunSummary, file: &ConfigFile) {
    println!("Coverage index complete");
    println!("  Destination:     {}", file.destination.path.display());
    println!("  Zoom levels:     {}..={}", file.zoom.min, file.zoom.max);
    println!("  Geometries:      {}", summary.geometries);
    println!("  Records:         {}", summary.records);
    if summary.decode_errors > 0 {
        println!("  Skipped rows:    {}", summary.decode_errors);
    }
    if summary.geometry_errors > 0 {
        println!("  Geometry errors: {}", summary.geometry_errors);
    }
    println!("  Batches:         {}", summary.batches_flushed);
    println!(
        "  Elapsed:         {:.2}s ({:.0} records/s)",
        summary.elapsed.as_secs_f64(),
        summary.records_per_second()
    );
}
