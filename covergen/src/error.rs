//! Error types shared between the source, sink and pipeline.
//!
//! Setup failures are fatal and abort a run before any geometry is read.
//! Write failures are fatal because durability of the coverage table can no
//! longer be guaranteed. Per-row errors live next to the code that raises
//! them ([`DecodeError`](crate::geometry::DecodeError),
//! [`GeometryError`](crate::geometry::GeometryError)).

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Failures while preparing the source or destination store.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("failed to open store {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to prepare source query '{query}': {source}")]
    Query {
        query: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("source query '{query}' returns {columns} column(s), expected (id, geometry)")]
    QueryColumns { query: String, columns: usize },

    #[error("invalid table name '{0}': only ASCII letters, digits and '_' are allowed")]
    InvalidTableName(String),

    #[error("failed to create table '{table}': {source}")]
    Schema {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to clear coverage table: {0}")]
    Truncate(#[source] StoreError),

    #[error("failed to create directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A failure inside a destination store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Backend(String),
}

/// A failed flush of buffered coverage records.
///
/// The batch is rolled back; no row of it is visible in the destination.
#[derive(Debug, Error)]
#[error("failed to flush {records} coverage record(s): {source}")]
pub struct WriteError {
    pub records: usize,
    #[source]
    pub source: StoreError,
}
