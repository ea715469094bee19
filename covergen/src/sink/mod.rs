//! Buffered coverage output.
//!
//! Workers append [`CoverageRecord`]s to a shared [`CoverageSink`]; the sink
//! buffers them and writes full batches through a [`CoverageStore`]. Each
//! batch is committed atomically, so a failed flush leaves no partial rows
//! behind.
//!
//! ```text
//! worker ─┐
//! worker ─┼──► buffer (Mutex<Vec>) ──► flush ──► store (Mutex<S>) ──► table
//! worker ─┘        take at batch size         one transaction per batch
//! ```
//!
//! The buffer lock is held only long enough to push or swap out a batch;
//! writing happens under the store lock so producers keep appending while a
//! batch is committed.

mod memory;
mod sqlite;

pub use memory::MemoryCoverageStore;
pub use sqlite::{SqliteCoverageStore, DEFAULT_COVERAGE_TABLE};

use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::coord::TileCoord;
use crate::error::{SetupError, StoreError, WriteError};

/// Default number of buffered records that triggers a flush.
pub const DEFAULT_FLUSH_BATCH_SIZE: usize = 50_000;

/// One `(zoom, tile, geometry)` association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoverageRecord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
    pub feature_id: i64,
}

impl CoverageRecord {
    pub fn new(tile: TileCoord, feature_id: i64) -> Self {
        Self {
            z: tile.z,
            x: tile.x,
            y: tile.y,
            feature_id,
        }
    }

    pub fn tile(&self) -> TileCoord {
        TileCoord::new(self.z, self.x, self.y)
    }

    /// The `features` column payload: the geometry id as 8 little-endian bytes.
    pub fn features_blob(&self) -> [u8; 8] {
        self.feature_id.to_le_bytes()
    }

    /// Reads a geometry id back from a `features` payload.
    pub fn feature_id_from_blob(blob: &[u8]) -> Option<i64> {
        let bytes: [u8; 8] = blob.try_into().ok()?;
        Some(i64::from_le_bytes(bytes))
    }
}

/// A destination for coverage records.
pub trait CoverageStore: Send {
    /// Removes every record from the coverage table.
    fn truncate(&mut self) -> Result<(), StoreError>;

    /// Writes `records` as one atomic batch.
    fn write_batch(&mut self, records: &[CoverageRecord]) -> Result<(), StoreError>;
}

impl<S: CoverageStore + ?Sized> CoverageStore for Box<S> {
    fn truncate(&mut self) -> Result<(), StoreError> {
        (**self).truncate()
    }

    fn write_batch(&mut self, records: &[CoverageRecord]) -> Result<(), StoreError> {
        (**self).write_batch(records)
    }
}

/// Thread-safe buffering front end of a [`CoverageStore`].
pub struct CoverageSink<S> {
    buffer: Mutex<Vec<CoverageRecord>>,
    store: Mutex<S>,
    flush_batch_size: usize,
    batches_flushed: AtomicU64,
    records_flushed: AtomicU64,
}

impl<S: CoverageStore> CoverageSink<S> {
    /// Creates a sink that flushes once `flush_batch_size` records are buffered.
    ///
    /// A batch size of zero is treated as one.
    pub fn new(store: S, flush_batch_size: usize) -> Self {
        let flush_batch_size = flush_batch_size.max(1);
        Self {
            buffer: Mutex::new(Vec::with_capacity(flush_batch_size)),
            store: Mutex::new(store),
            flush_batch_size,
            batches_flushed: AtomicU64::new(0),
            records_flushed: AtomicU64::new(0),
        }
    }

    /// Clears the destination table and any buffered records.
    ///
    /// Called once before a run so re-runs never mix with old output.
    pub fn begin_run(&self) -> Result<(), SetupError> {
        self.buffer.lock().clear();
        self.store.lock().truncate().map_err(SetupError::Truncate)
    }

    /// Buffers one record, flushing if the batch is full.
    pub fn append(&self, record: CoverageRecord) -> Result<(), WriteError> {
        self.extend(std::iter::once(record))
    }

    /// Buffers several records, flushing if the batch is full.
    pub fn extend(
        &self,
        records: impl IntoIterator<Item = CoverageRecord>,
    ) -> Result<(), WriteError> {
        let batch = {
            let mut buffer = self.buffer.lock();
            buffer.extend(records);
            if buffer.len() < self.flush_batch_size {
                return Ok(());
            }
            mem::replace(&mut *buffer, Vec::with_capacity(self.flush_batch_size))
        };
        self.write(batch)
    }

    /// Buffers several records unless `cancel` has fired.
    ///
    /// The token is checked under the buffer lock before buffering, and
    /// again under the store lock before a full batch is written, so nothing
    /// is committed once cancellation is observed. Returns `false` when the
    /// records (or the batch they completed) were dropped.
    pub fn extend_unless_cancelled(
        &self,
        records: impl IntoIterator<Item = CoverageRecord>,
        cancel: &CancellationToken,
    ) -> Result<bool, WriteError> {
        let batch = {
            let mut buffer = self.buffer.lock();
            if cancel.is_cancelled() {
                return Ok(false);
            }
            buffer.extend(records);
            if buffer.len() < self.flush_batch_size {
                return Ok(true);
            }
            mem::replace(&mut *buffer, Vec::with_capacity(self.flush_batch_size))
        };

        let mut store = self.store.lock();
        if cancel.is_cancelled() {
            debug!(records = batch.len(), "Dropped full batch after cancellation");
            return Ok(false);
        }
        self.write_to(&mut store, batch)?;
        Ok(true)
    }

    /// Commits every buffered record.
    ///
    /// Returns the number of records written. When this returns `Ok`, the
    /// records are visible in the destination store.
    pub fn flush(&self) -> Result<usize, WriteError> {
        let batch = mem::take(&mut *self.buffer.lock());
        let written = batch.len();
        if written > 0 {
            self.write(batch)?;
        }
        Ok(written)
    }

    /// Drops buffered records without writing them. Returns how many were dropped.
    pub fn discard(&self) -> usize {
        let dropped = mem::take(&mut *self.buffer.lock()).len();
        if dropped > 0 {
            debug!(records = dropped, "Discarded unflushed coverage records");
        }
        dropped
    }

    /// Number of records waiting for a flush.
    pub fn buffered(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn batches_flushed(&self) -> u64 {
        self.batches_flushed.load(Ordering::Relaxed)
    }

    pub fn records_flushed(&self) -> u64 {
        self.records_flushed.load(Ordering::Relaxed)
    }

    pub fn flush_batch_size(&self) -> usize {
        self.flush_batch_size
    }

    /// Consumes the sink, returning the store. Buffered records are dropped.
    pub fn into_store(self) -> S {
        self.store.into_inner()
    }

    fn write(&self, batch: Vec<CoverageRecord>) -> Result<(), WriteError> {
        self.write_to(&mut self.store.lock(), batch)
    }

    fn write_to(&self, store: &mut S, batch: Vec<CoverageRecord>) -> Result<(), WriteError> {
        let records = batch.len();
        store
            .write_batch(&batch)
            .map_err(|source| WriteError { records, source })?;

        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
        self.records_flushed
            .fetch_add(records as u64, Ordering::Relaxed);
        debug!(records, "Flushed coverage batch");
        Ok(())
    }
}
