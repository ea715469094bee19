//! INI serialization logic for converting `ConfigFile` → INI string.

use super::file::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let worker_count = config
        .workers
        .count
        .map(|n| n.to_string())
        .unwrap_or_default();
    let timeout_secs = config
        .run
        .timeout_secs
        .map(|n| n.to_string())
        .unwrap_or_default();

    format!(
        r#"[source]
; SQLite database holding the input polygons
path = {source_path}
; Query returning (id, WKB geometry) rows
query = {source_query}

[destination]
; SQLite database receiving the coverage index (created if missing)
path = {dest_path}
; Coverage table: (z INTEGER, x INTEGER, y INTEGER, features BLOB)
table = {dest_table}

[zoom]
; Inclusive zoom range, 0-30
min = {zoom_min}
max = {zoom_max}

[coverage]
; exact - tiles the geometry actually reaches
; bbox  - every tile of the bounding box (faster, superset of exact)
strategy = {strategy}
; sequential - one work item per geometry, zooms in ascending order
; parallel   - one work item per (geometry, zoom)
schedule = {schedule}

[workers]
; Worker pool size (empty = available parallelism)
count = {worker_count}
; Work items queued before the reader blocks
queue_capacity = {queue_capacity}

[sink]
; Buffered records per committed batch
flush_batch_size = {flush_batch_size}

[errors]
; Undecodable geometry rows: skip (log and continue) or fail (abort the run)
decode_policy = {decode_policy}

[progress]
; Log a progress line every N records (0 = off)
interval = {progress_interval}

[run]
; Abort the run after N seconds (empty = no deadline)
timeout_secs = {timeout_secs}

[logging]
directory = {log_directory}
file = {log_file}
"#,
        source_path = config.source.path.display(),
        source_query = config.source.query,
        dest_path = config.destination.path.display(),
        dest_table = config.destination.table,
        zoom_min = config.zoom.min,
        zoom_max = config.zoom.max,
        strategy = config.coverage.strategy,
        schedule = config.coverage.schedule,
        worker_count = worker_count,
        queue_capacity = config.workers.queue_capacity,
        flush_batch_size = config.sink.flush_batch_size,
        decode_policy = config.errors.decode_policy,
        progress_interval = config.progress.interval,
        timeout_secs = timeout_secs,
        log_directory = config.logging.directory.display(),
        log_file = config.logging.file,
    )
}
