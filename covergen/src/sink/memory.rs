//! In-memory coverage store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{CoverageRecord, CoverageStore};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Inner {
    records: Mutex<Vec<CoverageRecord>>,
    truncations: AtomicUsize,
    fail_writes: AtomicBool,
}

/// A coverage store held in memory.
///
/// Clones share the same table, so a caller can keep a handle for
/// inspection after moving a clone into a sink.
#[derive(Debug, Clone, Default)]
pub struct MemoryCoverageStore {
    inner: Arc<Inner>,
}

impl MemoryCoverageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the committed records, in write order.
    pub fn records(&self) -> Vec<CoverageRecord> {
        self.inner.records.lock().clone()
    }

    /// Committed records sorted by `(z, x, y, feature_id)`.
    pub fn sorted_records(&self) -> Vec<CoverageRecord> {
        let mut records = self.records();
        records.sort_unstable();
        records
    }

    pub fn len(&self) -> usize {
        self.inner.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn truncations(&self) -> usize {
        self.inner.truncations.load(Ordering::Relaxed)
    }

    /// Makes every subsequent batch write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::Relaxed);
    }
}

impl CoverageStore for MemoryCoverageStore {
    fn truncate(&mut self) -> Result<(), StoreError> {
        self.inner.records.lock().clear();
        self.inner.truncations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_batch(&mut self, records: &[CoverageRecord]) -> Result<(), StoreError> {
        if self.inner.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::Backend("write rejected".to_string()));
        }
        self.inner.records.lock().extend_from_slice(records);
        Ok(())
    }
}
