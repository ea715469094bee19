//! The coverage run.
//!
//! A run wires a [`GeometrySource`] to a [`CoverageSink`] through a bounded
//! work queue and a fixed pool of workers:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          CoveragePipeline                            │
//! │                                                                      │
//! │  reader (blocking)          bounded queue           worker pool      │
//! │  ┌──────────────┐   WorkItem   ┌───────┐   ┌──────────┐              │
//! │  │ scan + decode│─────────────►│ mpsc  │──►│ worker 0 │──┐           │
//! │  │ work_items() │ blocks when  │ (cap) │   │ worker 1 │──┼─► sink    │
//! │  └──────────────┘ queue full   └───────┘   │   ...    │──┘  (flush)  │
//! │                                            └──────────┘              │
//! │  CancellationToken ── external cancel / deadline / fatal error       │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each worker keeps a [`WorkerTally`]; the tallies are summed once the pool
//! drains, giving the authoritative record count. The shared
//! [`ProgressReporter`] only drives progress lines.
//!
//! Fatal conditions (write failure, decode failure under
//! [`DecodePolicy::Fail`](crate::config::DecodePolicy::Fail), source failure,
//! deadline, external cancellation) cancel the run token. Workers stop taking items, in-flight records are
//! dropped, the sink's unflushed buffer is discarded, and batches already
//! committed stay committed.

mod producer;
mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::CoverageConfig;
use crate::error::{SetupError, WriteError};
use crate::geometry::DecodeError;
use crate::scheduler::{WorkerTally, ZoomScheduler};
use crate::sink::{CoverageSink, CoverageStore};
use crate::source::{GeometrySource, SourceError};
use crate::telemetry::ProgressReporter;

use producer::{produce, ProducerReport};
use worker::{Worker, WorkerFailure};

/// Fatal outcomes of a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("source read failed: {0}")]
    Source(#[from] SourceError),

    #[error("failed to decode geometry {feature_id}: {source}")]
    Decode {
        feature_id: i64,
        #[source]
        source: DecodeError,
    },

    #[error("{0}")]
    Write(#[from] WriteError),

    #[error("run cancelled")]
    Cancelled,

    #[error("run exceeded its deadline of {}s", .0.as_secs_f64())]
    DeadlineExceeded(Duration),

    #[error("worker task failed: {0}")]
    WorkerPanicked(String),
}

/// Totals for a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunSummary {
    /// Rows read from the source.
    pub rows_read: u64,
    /// Rows decoded into geometries.
    pub geometries: u64,
    /// Rows skipped because their geometry could not be decoded.
    pub decode_errors: u64,
    pub work_items: u64,
    /// Coverage records produced (and committed).
    pub records: u64,
    /// (geometry, zoom) pairs skipped because coverage failed.
    pub geometry_errors: u64,
    pub batches_flushed: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.records as f64 / secs
        } else {
            0.0
        }
    }
}

/// Runs coverage over a source into a store.
pub struct CoveragePipeline<S> {
    config: CoverageConfig,
    sink: Arc<CoverageSink<S>>,
}

impl<S: CoverageStore + 'static> CoveragePipeline<S> {
    /// Creates a pipeline writing to `store`.
    ///
    /// Fails if the configuration is invalid.
    pub fn new(config: CoverageConfig, store: S) -> Result<Self, SetupError> {
        config.validate()?;
        let sink = Arc::new(CoverageSink::new(store, config.flush_batch_size));
        Ok(Self { config, sink })
    }

    pub fn config(&self) -> &CoverageConfig {
        &self.config
    }

    pub fn sink(&self) -> &CoverageSink<S> {
        &self.sink
    }

    /// Consumes the pipeline, returning the store.
    ///
    /// Returns `None` if a worker from an aborted run still holds the sink.
    pub fn into_store(self) -> Option<S> {
        Arc::try_unwrap(self.sink)
            .ok()
            .map(CoverageSink::into_store)
    }

    /// Performs one run: clears the destination, covers every source
    /// geometry over the zoom range, and commits the records.
    ///
    /// Cancelling `cancel` stops the run promptly with
    /// [`RunError::Cancelled`].
    pub async fn run<G: GeometrySource>(
        &self,
        source: G,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, RunError> {
        let started = Instant::now();
        let config = &self.config;

        info!(
            zooms = %config.zooms,
            strategy = %config.strategy,
            schedule = %config.schedule,
            workers = config.worker_count,
            queue_capacity = config.queue_capacity,
            flush_batch_size = config.flush_batch_size,
            "Starting coverage run"
        );

        self.sink.begin_run()?;
        let batches_before = self.sink.batches_flushed();

        let run_token = cancel.child_token();
        let scheduler = ZoomScheduler::new(config.zooms, config.strategy, config.schedule);
        let progress = Arc::new(ProgressReporter::new(config.progress_interval));
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let queue = Arc::new(Mutex::new(rx));

        let workers: Vec<_> = (0..config.worker_count)
            .map(|id| {
                tokio::spawn(
                    Worker {
                        id,
                        queue: Arc::clone(&queue),
                        scheduler,
                        sink: Arc::clone(&self.sink),
                        progress: Arc::clone(&progress),
                        cancel: run_token.clone(),
                    }
                    .run(),
                )
            })
            .collect();
        // Workers own the receiver now; once they all exit the reader's
        // sends fail instead of blocking.
        drop(queue);

        let reader = {
            let token = run_token.clone();
            let decode_policy = config.decode_policy;
            tokio::task::spawn_blocking(move || {
                produce(source, scheduler, decode_policy, tx, token)
            })
        };

        let deadline_hit = Arc::new(AtomicBool::new(false));
        let timer = config.deadline.map(|limit| {
            let token = run_token.clone();
            let hit = Arc::clone(&deadline_hit);
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(limit) => {
                        warn!(limit_secs = limit.as_secs_f64(), "Run deadline reached, cancelling");
                        hit.store(true, Ordering::SeqCst);
                        token.cancel();
                    }
                    _ = token.cancelled() => {}
                }
            })
        });

        let mut failure: Option<RunError> = None;

        let report = match reader.await {
            Ok(report) => report,
            Err(e) => {
                run_token.cancel();
                keep_first(&mut failure, RunError::WorkerPanicked(format!("source reader: {e}")));
                ProducerReport::default()
            }
        };

        let mut tally = WorkerTally::default();
        for handle in workers {
            match handle.await {
                Ok(Ok(worker_tally)) => tally += worker_tally,
                Ok(Err(WorkerFailure::Write(e))) => keep_first(&mut failure, RunError::Write(e)),
                Ok(Err(WorkerFailure::Panicked(msg))) => {
                    keep_first(&mut failure, RunError::WorkerPanicked(msg))
                }
                Err(e) => keep_first(&mut failure, RunError::WorkerPanicked(e.to_string())),
            }
        }

        if let Some(timer) = timer {
            timer.abort();
        }

        if let Some(reader_failure) = report.failure {
            keep_first(&mut failure, reader_failure);
        }
        if deadline_hit.load(Ordering::SeqCst) {
            if let Some(limit) = config.deadline {
                keep_first(&mut failure, RunError::DeadlineExceeded(limit));
            }
        }
        if cancel.is_cancelled() {
            keep_first(&mut failure, RunError::Cancelled);
        }

        if let Some(err) = failure {
            let discarded = self.sink.discard();
            error!(
                error = %err,
                committed_batches = self.sink.batches_flushed() - batches_before,
                discarded_records = discarded,
                elapsed_secs = started.elapsed().as_secs_f64(),
                "Coverage run aborted"
            );
            return Err(err);
        }

        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || sink.flush())
            .await
            .map_err(|e| RunError::WorkerPanicked(format!("final flush: {e}")))??;

        debug_assert_eq!(tally.records, progress.total());

        let summary = RunSummary {
            rows_read: report.rows,
            geometries: report.geometries,
            decode_errors: report.decode_errors,
            work_items: tally.items,
            records: tally.records,
            geometry_errors: tally.geometry_errors,
            batches_flushed: self.sink.batches_flushed() - batches_before,
            elapsed: started.elapsed(),
        };

        info!(
            records = summary.records,
            geometries = summary.geometries,
            decode_errors = summary.decode_errors,
            geometry_errors = summary.geometry_errors,
            batches = summary.batches_flushed,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Coverage run complete: {} records in {:.2}s",
            summary.records,
            summary.elapsed.as_secs_f64()
        );

        Ok(summary)
    }
}

/// Records `err` unless an earlier failure is already the cause.
fn keep_first(slot: &mut Option<RunError>, err: RunError) {
    if slot.is_none() {
        *slot = Some(err);
    }
}
