//! Pool worker: pulls work items, covers them, and appends to the sink.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::WriteError;
use crate::scheduler::{WorkItem, WorkerTally, ZoomScheduler};
use crate::sink::{CoverageSink, CoverageStore};
use crate::telemetry::ProgressReporter;

/// Receiving end of the work queue, shared by the pool.
pub(super) type SharedQueue = Arc<Mutex<mpsc::Receiver<WorkItem>>>;

/// Why a worker stopped early.
#[derive(Debug)]
pub(super) enum WorkerFailure {
    Write(WriteError),
    Panicked(String),
}

pub(super) struct Worker<S> {
    pub id: usize,
    pub queue: SharedQueue,
    pub scheduler: ZoomScheduler,
    pub sink: Arc<CoverageSink<S>>,
    pub progress: Arc<ProgressReporter>,
    pub cancel: CancellationToken,
}

impl<S: CoverageStore + 'static> Worker<S> {
    /// Processes items until the queue closes or the run is cancelled.
    ///
    /// Returns this worker's partial sums. Coverage runs on the blocking
    /// pool; the async task only waits on the queue.
    pub(super) async fn run(self) -> Result<WorkerTally, WorkerFailure> {
        let mut tally = WorkerTally::default();

        loop {
            let item = {
                let mut queue = self.queue.lock().await;
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => None,
                    item = queue.recv() => item,
                }
            };
            let Some(item) = item else {
                break;
            };

            let scheduler = self.scheduler;
            let sink = Arc::clone(&self.sink);
            let cancel = self.cancel.clone();
            let outcome =
                tokio::task::spawn_blocking(move || cover_and_append(scheduler, &item, &sink, &cancel))
                    .await;

            match outcome {
                Ok(Ok(Some(delta))) => {
                    self.progress.record(delta.records);
                    tally += delta;
                }
                Ok(Ok(None)) => break,
                Ok(Err(e)) => {
                    error!(worker = self.id, error = %e, "Coverage flush failed");
                    self.cancel.cancel();
                    return Err(WorkerFailure::Write(e));
                }
                Err(e) => {
                    error!(worker = self.id, error = %e, "Coverage task panicked");
                    self.cancel.cancel();
                    return Err(WorkerFailure::Panicked(e.to_string()));
                }
            }
        }

        debug!(
            worker = self.id,
            items = tally.items,
            records = tally.records,
            geometry_errors = tally.geometry_errors,
            "Worker finished"
        );
        Ok(tally)
    }
}

/// Covers one item and buffers its records.
///
/// Returns `None` when the run was cancelled before the records reached the
/// sink; they are dropped.
fn cover_and_append<S: CoverageStore>(
    scheduler: ZoomScheduler,
    item: &WorkItem,
    sink: &CoverageSink<S>,
    cancel: &CancellationToken,
) -> Result<Option<WorkerTally>, WriteError> {
    let mut delta = WorkerTally::default();
    let Some(records) = scheduler.process(item, cancel, &mut delta) else {
        return Ok(None);
    };
    if !sink.extend_unless_cancelled(records, cancel)? {
        return Ok(None);
    }
    Ok(Some(delta))
}
