//! Covergen - per-zoom tile coverage indexing
//!
//! Reads polygons from a spatial store, computes the slippy-map tiles each
//! one covers at every zoom level of a configured range, and writes
//! `(z, x, y, geometry id)` records to a destination table.
//!
//! # Modules
//!
//! - [`coord`]: tile coordinates, zoom ranges, Web Mercator projection
//! - [`geometry`]: features, WKB decoding and validation
//! - [`cover`]: the tile coverage engine (exact and bbox strategies)
//! - [`source`] / [`sink`]: geometry input and buffered coverage output
//! - [`scheduler`]: zoom scheduling policies
//! - [`pipeline`]: the bounded worker pool that drives a run
//! - [`config`], [`logging`], [`telemetry`]: configuration, logs, progress
//!
//! # Example
//!
//! ```ignore
//! use covergen::config::CoverageConfig;
//! use covergen::pipeline::CoveragePipeline;
//! use covergen::sink::SqliteCoverageStore;
//! use covergen::source::{SqliteSource, DEFAULT_SOURCE_QUERY};
//! use tokio_util::sync::CancellationToken;
//!
//! let source = SqliteSource::open("db/spatial.db", DEFAULT_SOURCE_QUERY)?;
//! let store = SqliteCoverageStore::open("db/out.db", "temp")?;
//! let pipeline = CoveragePipeline::new(CoverageConfig::default(), store)?;
//!
//! let summary = pipeline.run(source, &CancellationToken::new()).await?;
//! println!("{} records", summary.records);
//! ```

pub mod config;
pub mod coord;
pub mod cover;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod pipeline;
pub mod scheduler;
pub mod sink;
pub mod source;
pub mod telemetry;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
