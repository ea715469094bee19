//! Integration tests for the coverage pipeline against SQLite stores.
//!
//! These tests verify the complete flow including:
//! - WKB rows in a source database → coverage records in the destination table
//! - Truncate-then-repopulate reruns
//! - Determinism across worker counts and schedule policies
//! - Decode failure policies
//!
//! Run with: `cargo test --test pipeline_integration`

use std::path::{Path, PathBuf};

use geo::{polygon, Geometry, Point, Polygon};
use rusqlite::{params, Connection};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use covergen::config::{CoverageConfig, DecodePolicy};
use covergen::coord::{tile_geo_bounds, TileCoord, ZoomRange};
use covergen::cover::Strategy;
use covergen::geometry::encode_wkb;
use covergen::pipeline::{CoveragePipeline, RunError, RunSummary};
use covergen::scheduler::SchedulePolicy;
use covergen::sink::{CoverageRecord, SqliteCoverageStore, DEFAULT_COVERAGE_TABLE};
use covergen::source::{SqliteSource, DEFAULT_SOURCE_QUERY};

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a source database with a `polygons (id, geom)` table.
fn create_source(dir: &Path, rows: &[(i64, Vec<u8>)]) -> PathBuf {
    let path = dir.join("spatial.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE polygons (id INTEGER PRIMARY KEY, geom BLOB);")
        .unwrap();
    for (id, geom) in rows {
        conn.execute(
            "INSERT INTO polygons (id, geom) VALUES (?1, ?2)",
            params![id, geom],
        )
        .unwrap();
    }
    path
}

fn wkb(geometry: impl Into<Geometry<f64>>) -> Vec<u8> {
    encode_wkb(&geometry.into()).unwrap()
}

/// A handful of real-world shapes of different sizes.
fn sample_rows() -> Vec<(i64, Vec<u8>)> {
    vec![
        (
            1,
            wkb(polygon![
                (x: 2.25, y: 48.80),
                (x: 2.45, y: 48.80),
                (x: 2.45, y: 48.92),
                (x: 2.25, y: 48.92),
            ]),
        ),
        (
            2,
            wkb(polygon![
                (x: 9.73, y: 53.39),
                (x: 10.33, y: 53.39),
                (x: 10.33, y: 53.74),
                (x: 9.73, y: 53.74),
            ]),
        ),
        (3, wkb(Point::new(-73.9857, 40.7484))),
        (
            4,
            wkb(polygon![
                (x: 139.60, y: 35.60),
                (x: 139.90, y: 35.62),
                (x: 139.75, y: 35.80),
            ]),
        ),
    ]
}

fn config(min: u8, max: u8) -> CoverageConfig {
    CoverageConfig::default()
        .with_zooms(ZoomRange::new(min, max).unwrap())
        .with_worker_count(4)
        .with_queue_capacity(8)
        .with_flush_batch_size(64)
}

/// Run the pipeline once and return the summary with the table contents.
async fn run_once(
    source_path: &Path,
    dest_path: &Path,
    config: CoverageConfig,
) -> Result<(RunSummary, Vec<CoverageRecord>), RunError> {
    let source = SqliteSource::open(source_path, DEFAULT_SOURCE_QUERY)?;
    let store = SqliteCoverageStore::open(dest_path, DEFAULT_COVERAGE_TABLE)?;
    let pipeline = CoveragePipeline::new(config, store)?;

    let summary = pipeline.run(source, &CancellationToken::new()).await?;

    let store = pipeline.into_store().expect("sink released after run");
    let records = store.read_all().unwrap();
    Ok((summary, records))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_empty_source_produces_no_rows() {
    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path(), &[]);
    let dest = dir.path().join("out.db");

    let (summary, records) = run_once(&source, &dest, config(0, 12)).await.unwrap();

    assert_eq!(summary.rows_read, 0);
    assert_eq!(summary.records, 0);
    assert!(records.is_empty());
    assert_eq!(
        SqliteCoverageStore::open(&dest, DEFAULT_COVERAGE_TABLE)
            .unwrap()
            .count()
            .unwrap(),
        0
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rerun_replaces_previous_table() {
    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path(), &sample_rows());
    let dest = dir.path().join("out.db");

    let (first_summary, first) = run_once(&source, &dest, config(6, 11)).await.unwrap();
    let (second_summary, second) = run_once(&source, &dest, config(6, 11)).await.unwrap();

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(first_summary.records, second_summary.records);
    assert_eq!(second.len() as u64, second_summary.records);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_output_independent_of_worker_count() {
    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path(), &sample_rows());

    let (_, single) = run_once(
        &source,
        &dir.path().join("one.db"),
        config(5, 12).with_worker_count(1),
    )
    .await
    .unwrap();
    let (_, many) = run_once(
        &source,
        &dir.path().join("many.db"),
        config(5, 12).with_worker_count(8),
    )
    .await
    .unwrap();

    assert_eq!(single, many);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_output_independent_of_schedule_policy() {
    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path(), &sample_rows());

    let (_, sequential) = run_once(
        &source,
        &dir.path().join("sequential.db"),
        config(5, 12).with_schedule(SchedulePolicy::Sequential),
    )
    .await
    .unwrap();
    let (_, parallel) = run_once(
        &source,
        &dir.path().join("parallel.db"),
        config(5, 12).with_schedule(SchedulePolicy::ParallelPerZoom),
    )
    .await
    .unwrap();

    assert_eq!(sequential, parallel);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exact_coverage_is_subset_of_bbox() {
    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path(), &sample_rows());

    let (_, exact) = run_once(
        &source,
        &dir.path().join("exact.db"),
        config(4, 11).with_strategy(Strategy::Exact),
    )
    .await
    .unwrap();
    let (_, bbox) = run_once(
        &source,
        &dir.path().join("bbox.db"),
        config(4, 11).with_strategy(Strategy::Bbox),
    )
    .await
    .unwrap();

    assert!(exact.len() <= bbox.len());
    assert!(exact.iter().all(|r| bbox.binary_search(r).is_ok()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_inscribed_square_covers_one_tile_then_four() {
    let parent = TileCoord::new(10, 544, 355);
    let square: Polygon<f64> = tile_geo_bounds(&parent).to_polygon();

    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path(), &[(42, wkb(square))]);

    for strategy in [Strategy::Exact, Strategy::Bbox] {
        let dest = dir.path().join(format!("{strategy}.db"));
        let (_, records) = run_once(&source, &dest, config(10, 11).with_strategy(strategy))
            .await
            .unwrap();

        let at_10: Vec<TileCoord> = records
            .iter()
            .filter(|r| r.z == 10)
            .map(CoverageRecord::tile)
            .collect();
        let at_11: Vec<TileCoord> = records
            .iter()
            .filter(|r| r.z == 11)
            .map(CoverageRecord::tile)
            .collect();

        assert_eq!(at_10, vec![parent], "{strategy}");
        let mut children = parent.children().to_vec();
        children.sort_unstable();
        assert_eq!(at_11, children, "{strategy}");
        assert!(records.iter().all(|r| r.feature_id == 42));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_undecodable_row_skipped_or_fatal_by_policy() {
    let dir = TempDir::new().unwrap();
    let mut rows = sample_rows();
    rows.push((99, vec![0x01, 0x02, 0x03]));
    let source = create_source(dir.path(), &rows);

    let (summary, records) = run_once(
        &source,
        &dir.path().join("skip.db"),
        config(8, 10).with_decode_policy(DecodePolicy::Skip),
    )
    .await
    .unwrap();
    assert_eq!(summary.rows_read, 5);
    assert_eq!(summary.decode_errors, 1);
    assert!(records.iter().all(|r| r.feature_id != 99));

    let err = run_once(
        &source,
        &dir.path().join("fail.db"),
        config(8, 10).with_decode_policy(DecodePolicy::Fail),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RunError::Decode { feature_id: 99, .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_text_geometry_column_follows_decode_policy() {
    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path(), &sample_rows());
    {
        let conn = Connection::open(&source).unwrap();
        conn.execute(
            "INSERT INTO polygons (id, geom) VALUES (?1, ?2)",
            params![50, "POINT(1 2)"],
        )
        .unwrap();
    }

    let (summary, records) = run_once(&source, &dir.path().join("skip.db"), config(8, 10))
        .await
        .unwrap();
    assert_eq!(summary.rows_read, 5);
    assert_eq!(summary.decode_errors, 1);
    assert_eq!(summary.geometries, 4);
    assert!(records.iter().all(|r| r.feature_id != 50));

    let err = run_once(
        &source,
        &dir.path().join("fail.db"),
        config(8, 10).with_decode_policy(DecodePolicy::Fail),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RunError::Decode { feature_id: 50, .. }));
}

#[tokio::test]
async fn test_missing_source_is_setup_error() {
    let dir = TempDir::new().unwrap();
    let err = run_once(
        &dir.path().join("absent.db"),
        &dir.path().join("out.db"),
        config(0, 4),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RunError::Setup(_)));
}
