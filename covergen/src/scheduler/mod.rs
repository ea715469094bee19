//! Zoom scheduling.
//!
//! The [`ZoomScheduler`] expands each feature into work items over the
//! configured zoom range and turns a work item into coverage records. How a
//! feature is split depends on the [`SchedulePolicy`]:
//!
//! | Policy            | Items per feature | Zoom order within item |
//! |-------------------|-------------------|------------------------|
//! | `Sequential`      | 1                 | ascending              |
//! | `ParallelPerZoom` | one per zoom      | n/a                    |
//!
//! Either way the records produced for a feature are the same set; only the
//! grain of the work handed to the worker pool differs.
//!
//! Coverage failures are per (feature, zoom): they are counted in the
//! worker's [`WorkerTally`], logged, and the remaining zooms carry on.

use std::fmt;
use std::iter::Sum;
use std::ops::AddAssign;
use std::str::FromStr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::coord::ZoomRange;
use crate::cover::{cover, Strategy};
use crate::geometry::Feature;
use crate::sink::CoverageRecord;

/// How a feature's zoom levels are divided into work items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SchedulePolicy {
    /// One item per feature; zooms processed in ascending order.
    Sequential,
    /// One independent item per (feature, zoom).
    #[default]
    ParallelPerZoom,
}

impl SchedulePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            SchedulePolicy::Sequential => "sequential",
            SchedulePolicy::ParallelPerZoom => "parallel",
        }
    }
}

impl fmt::Display for SchedulePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SchedulePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(SchedulePolicy::Sequential),
            "parallel" | "parallel-per-zoom" => Ok(SchedulePolicy::ParallelPerZoom),
            other => Err(format!(
                "unknown schedule '{}', expected sequential or parallel",
                other
            )),
        }
    }
}

/// A unit of work: one feature over some of its zoom levels.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub feature: Arc<Feature>,
    pub zooms: ZoomRange,
}

/// Per-worker partial sums, merged once when the pool drains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerTally {
    /// Work items completed.
    pub items: u64,
    /// Coverage records produced.
    pub records: u64,
    /// (feature, zoom) pairs skipped because coverage failed.
    pub geometry_errors: u64,
}

impl AddAssign for WorkerTally {
    fn add_assign(&mut self, other: Self) {
        self.items += other.items;
        self.records += other.records;
        self.geometry_errors += other.geometry_errors;
    }
}

impl Sum for WorkerTally {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(WorkerTally::default(), |mut acc, t| {
            acc += t;
            acc
        })
    }
}

/// Drives the coverage engine over a zoom range.
#[derive(Debug, Clone, Copy)]
pub struct ZoomScheduler {
    zooms: ZoomRange,
    strategy: Strategy,
    policy: SchedulePolicy,
}

impl ZoomScheduler {
    pub fn new(zooms: ZoomRange, strategy: Strategy, policy: SchedulePolicy) -> Self {
        Self {
            zooms,
            strategy,
            policy,
        }
    }

    pub fn zooms(&self) -> ZoomRange {
        self.zooms
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn policy(&self) -> SchedulePolicy {
        self.policy
    }

    /// Splits a feature into work items according to the policy.
    pub fn work_items(&self, feature: Feature) -> Vec<WorkItem> {
        let feature = Arc::new(feature);
        match self.policy {
            SchedulePolicy::Sequential => vec![WorkItem {
                feature,
                zooms: self.zooms,
            }],
            SchedulePolicy::ParallelPerZoom => self
                .zooms
                .iter()
                .filter_map(|zoom| ZoomRange::single(zoom).ok())
                .map(|zooms| WorkItem {
                    feature: Arc::clone(&feature),
                    zooms,
                })
                .collect(),
        }
    }

    /// Covers every zoom of `item`, ascending.
    ///
    /// Zooms whose coverage fails are logged and skipped. Returns `None` if
    /// `cancel` fires before the item completes; the partial records are
    /// dropped and the tally is left untouched.
    pub fn process(
        &self,
        item: &WorkItem,
        cancel: &CancellationToken,
        tally: &mut WorkerTally,
    ) -> Option<Vec<CoverageRecord>> {
        let feature = &item.feature;
        let mut records = Vec::new();
        let mut geometry_errors = 0;

        for zoom in item.zooms.iter() {
            if cancel.is_cancelled() {
                return None;
            }
            match cover(&feature.geometry, zoom, self.strategy) {
                Ok(tiles) => records.extend(
                    tiles
                        .into_iter()
                        .map(|tile| CoverageRecord::new(tile, feature.id)),
                ),
                Err(e) => {
                    geometry_errors += 1;
                    warn!(
                        feature_id = feature.id,
                        zoom,
                        error = %e,
                        "Skipping geometry at zoom level"
                    );
                }
            }
        }

        tally.items += 1;
        tally.records += records.len() as u64;
        tally.geometry_errors += geometry_errors;
        Some(records)
    }

    /// Covers a feature over the whole zoom range on the calling thread.
    pub fn cover_feature(&self, feature: Feature) -> (Vec<CoverageRecord>, WorkerTally) {
        let cancel = CancellationToken::new();
        let mut tally = WorkerTally::default();
        let mut records = Vec::new();
        for item in self.work_items(feature) {
            if let Some(batch) = self.process(&item, &cancel, &mut tally) {
                records.extend(batch);
            }
        }
        (records, tally)
    }
}

impl Default for ZoomScheduler {
    fn default() -> Self {
        Self::new(
            ZoomRange::default(),
            Strategy::default(),
            SchedulePolicy::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Geometry, LineString, Point, Polygon};

    fn square(id: i64) -> Feature {
        Feature::new(
            id,
            polygon![
                (x: 13.30, y: 52.45),
                (x: 13.50, y: 52.45),
                (x: 13.50, y: 52.60),
                (x: 13.30, y: 52.60),
            ],
        )
    }

    fn scheduler(min: u8, max: u8, policy: SchedulePolicy) -> ZoomScheduler {
        ZoomScheduler::new(ZoomRange::new(min, max).unwrap(), Strategy::Exact, policy)
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "sequential".parse::<SchedulePolicy>(),
            Ok(SchedulePolicy::Sequential)
        );
        assert_eq!(
            "Parallel".parse::<SchedulePolicy>(),
            Ok(SchedulePolicy::ParallelPerZoom)
        );
        assert_eq!(
            "parallel-per-zoom".parse::<SchedulePolicy>(),
            Ok(SchedulePolicy::ParallelPerZoom)
        );
        assert!("eager".parse::<SchedulePolicy>().is_err());
        assert_eq!(SchedulePolicy::default().to_string(), "parallel");
    }

    #[test]
    fn test_work_items_per_policy() {
        let sequential = scheduler(3, 7, SchedulePolicy::Sequential).work_items(square(1));
        assert_eq!(sequential.len(), 1);
        assert_eq!(sequential[0].zooms, ZoomRange::new(3, 7).unwrap());

        let parallel = scheduler(3, 7, SchedulePolicy::ParallelPerZoom).work_items(square(1));
        let zooms: Vec<u8> = parallel.iter().map(|item| item.zooms.min()).collect();
        assert_eq!(zooms, vec![3, 4, 5, 6, 7]);
        assert!(parallel.iter().all(|item| item.zooms.len() == 1));
    }

    #[test]
    fn test_policies_produce_same_records() {
        let (mut sequential, seq_tally) =
            scheduler(8, 13, SchedulePolicy::Sequential).cover_feature(square(5));
        let (mut parallel, par_tally) =
            scheduler(8, 13, SchedulePolicy::ParallelPerZoom).cover_feature(square(5));

        sequential.sort();
        parallel.sort();
        assert_eq!(sequential, parallel);
        assert_eq!(seq_tally.records, par_tally.records);
        assert_eq!(seq_tally.items, 1);
        assert_eq!(par_tally.items, 6);
    }

    #[test]
    fn test_point_yields_one_record_per_zoom() {
        let (records, tally) = scheduler(10, 22, SchedulePolicy::Sequential)
            .cover_feature(Feature::new(7, Point::new(-0.1276, 51.5072)));

        assert_eq!(records.len(), 13);
        assert_eq!(tally.records, 13);
        assert!(records.iter().all(|r| r.feature_id == 7));
        let zooms: Vec<u8> = records.iter().map(|r| r.z).collect();
        assert_eq!(zooms, (10..=22).collect::<Vec<u8>>());
    }

    #[test]
    fn test_invalid_geometry_is_counted_not_fatal() {
        let broken: Geometry<f64> = Point::new(f64::NAN, 0.0).into();
        let (records, tally) =
            scheduler(1, 4, SchedulePolicy::ParallelPerZoom).cover_feature(Feature::new(1, broken));

        assert!(records.is_empty());
        assert_eq!(tally.geometry_errors, 4);
        assert_eq!(tally.items, 4);
    }

    #[test]
    fn test_empty_geometry_yields_nothing() {
        let empty = Polygon::new(LineString::new(vec![]), vec![]);
        let (records, tally) =
            scheduler(10, 22, SchedulePolicy::Sequential).cover_feature(Feature::new(1, empty));

        assert!(records.is_empty());
        assert_eq!(tally.geometry_errors, 0);
    }

    #[test]
    fn test_cancelled_item_returns_none() {
        let scheduler = scheduler(10, 12, SchedulePolicy::Sequential);
        let item = scheduler.work_items(square(1)).remove(0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut tally = WorkerTally::default();
        assert!(scheduler.process(&item, &cancel, &mut tally).is_none());
        assert_eq!(tally, WorkerTally::default());
    }

    #[test]
    fn test_tally_sum() {
        let tallies = vec![
            WorkerTally { items: 1, records: 10, geometry_errors: 0 },
            WorkerTally { items: 2, records: 5, geometry_errors: 1 },
        ];
        let total: WorkerTally = tallies.into_iter().sum();
        assert_eq!(total, WorkerTally { items: 3, records: 15, geometry_errors: 1 });
    }
}
