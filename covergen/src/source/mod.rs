//! Geometry sources.
//!
//! A source makes one forward pass over its rows and hands each
//! `(id, payload)` pair to a visitor. Payloads stay encoded until the reader
//! decodes them with [`SourceRow::decode`], so the caller decides whether a
//! malformed row is skipped or ends the run.
//!
//! ```text
//! SqliteSource ──► GeometryStream (cursor) ──► visit(SourceRow) ──► decode ──► work queue
//! ```
//!
//! The pass is not restartable: a second `scan` fails with
//! [`SourceError::Exhausted`].

mod memory;
mod sqlite;

pub use memory::MemorySource;
pub use sqlite::{GeometryStream, SqliteSource, DEFAULT_SOURCE_QUERY};

use std::ops::ControlFlow;

use thiserror::Error;

use crate::geometry::{DecodeError, Feature};

/// Errors raised while advancing a source cursor.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read source row: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("source has already been scanned")]
    Exhausted,
}

/// The geometry column of a source row, as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowPayload {
    /// WKB bytes. A NULL column yields an empty payload.
    Wkb(Vec<u8>),
    /// A value of another storage class (text, integer, real).
    NotBinary(&'static str),
}

/// One undecoded row from the source store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub id: i64,
    pub payload: RowPayload,
}

impl SourceRow {
    pub fn new(id: i64, payload: Vec<u8>) -> Self {
        Self {
            id,
            payload: RowPayload::Wkb(payload),
        }
    }

    /// A row whose geometry column holds a non-binary value of type `found`.
    pub fn not_binary(id: i64, found: &'static str) -> Self {
        Self {
            id,
            payload: RowPayload::NotBinary(found),
        }
    }

    /// Decodes the payload into a feature.
    pub fn decode(&self) -> Result<Feature, DecodeError> {
        match &self.payload {
            RowPayload::Wkb(bytes) => Feature::from_wkb(self.id, bytes),
            RowPayload::NotBinary(found) => Err(DecodeError::NotBinary(*found)),
        }
    }
}

/// A single-pass provider of source rows.
pub trait GeometrySource: Send + 'static {
    /// Feeds every row to `visit` in cursor order.
    ///
    /// Stops early when `visit` returns [`ControlFlow::Break`]. Returns the
    /// number of rows handed to `visit`.
    fn scan(
        &mut self,
        visit: &mut dyn FnMut(SourceRow) -> ControlFlow<()>,
    ) -> Result<u64, SourceError>;
}
