//! Source reader: decodes rows and feeds the work queue.

use std::ops::ControlFlow;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::RunError;
use crate::config::DecodePolicy;
use crate::scheduler::{WorkItem, ZoomScheduler};
use crate::source::GeometrySource;

/// What the reader saw during its pass.
#[derive(Debug, Default)]
pub(super) struct ProducerReport {
    pub rows: u64,
    pub geometries: u64,
    pub decode_errors: u64,
    pub failure: Option<RunError>,
}

/// Scans `source`, pushing work items into `queue`.
///
/// Runs on a blocking thread: `blocking_send` parks the reader while the
/// queue is full. Stops when the source is exhausted, when `cancel` fires, or
/// when every worker has gone away. A decode failure under
/// [`DecodePolicy::Fail`] or a cursor error cancels the run.
pub(super) fn produce<G: GeometrySource>(
    mut source: G,
    scheduler: ZoomScheduler,
    decode_policy: DecodePolicy,
    queue: mpsc::Sender<WorkItem>,
    cancel: CancellationToken,
) -> ProducerReport {
    let mut report = ProducerReport::default();

    let scanned = source.scan(&mut |row| {
        if cancel.is_cancelled() {
            return ControlFlow::Break(());
        }

        match row.decode() {
            Ok(feature) => {
                report.geometries += 1;
                for item in scheduler.work_items(feature) {
                    if queue.blocking_send(item).is_err() {
                        return ControlFlow::Break(());
                    }
                }
            }
            Err(e) if decode_policy == DecodePolicy::Skip => {
                report.decode_errors += 1;
                warn!(feature_id = row.id, error = %e, "Skipping undecodable geometry");
            }
            Err(e) => {
                error!(feature_id = row.id, error = %e, "Undecodable geometry, aborting run");
                report.failure = Some(RunError::Decode {
                    feature_id: row.id,
                    source: e,
                });
                cancel.cancel();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    });

    match scanned {
        Ok(rows) => {
            report.rows = rows;
            debug!(
                rows,
                geometries = report.geometries,
                decode_errors = report.decode_errors,
                "Source pass finished"
            );
        }
        Err(e) => {
            error!(error = %e, "Source read failed");
            cancel.cancel();
            if report.failure.is_none() {
                report.failure = Some(RunError::Source(e));
            }
        }
    }

    report
}
