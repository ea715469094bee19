//! In-memory geometry source.

use std::ops::ControlFlow;

use geozero::error::GeozeroError;

use super::{GeometrySource, SourceError, SourceRow};
use crate::geometry::{encode_wkb, Feature};

/// A source backed by a vector of rows.
///
/// Behaves like a store cursor: rows are yielded once, in order.
#[derive(Debug, Default)]
pub struct MemorySource {
    rows: Option<Vec<SourceRow>>,
}

impl MemorySource {
    pub fn new(rows: Vec<SourceRow>) -> Self {
        Self { rows: Some(rows) }
    }

    /// Builds a source by WKB-encoding each feature.
    pub fn from_features<'a>(
        features: impl IntoIterator<Item = &'a Feature>,
    ) -> Result<Self, GeozeroError> {
        let rows = features
            .into_iter()
            .map(|f| encode_wkb(&f.geometry).map(|wkb| SourceRow::new(f.id, wkb)))
            .collect::<Result<Vec<_>, GeozeroError>>()?;
        Ok(Self::new(rows))
    }

    /// Rows not yet scanned, or `None` once the pass has happened.
    pub fn remaining(&self) -> Option<usize> {
        self.rows.as_ref().map(Vec::len)
    }
}

impl GeometrySource for MemorySource {
    fn scan(
        &mut self,
        visit: &mut dyn FnMut(SourceRow) -> ControlFlow<()>,
    ) -> Result<u64, SourceError> {
        let rows = self.rows.take().ok_or(SourceError::Exhausted)?;

        let mut visited = 0u64;
        for row in rows {
            visited += 1;
            if visit(row).is_break() {
                break;
            }
        }
        Ok(visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    #[test]
    fn test_from_features_round_trips_ids() {
        let features = vec![
            Feature::new(3, Point::new(0.0, 0.0)),
            Feature::new(9, Point::new(1.0, 1.0)),
        ];
        let mut source = MemorySource::from_features(&features).unwrap();
        assert_eq!(source.remaining(), Some(2));

        let mut decoded = Vec::new();
        let visited = source
            .scan(&mut |row| {
                decoded.push(row.decode().unwrap());
                ControlFlow::Continue(())
            })
            .unwrap();

        assert_eq!(visited, 2);
        assert_eq!(decoded, features);
        assert_eq!(source.remaining(), None);
    }

    #[test]
    fn test_second_scan_fails() {
        let mut source = MemorySource::new(Vec::new());
        source.scan(&mut |_| ControlFlow::Continue(())).unwrap();
        assert!(matches!(
            source.scan(&mut |_| ControlFlow::Continue(())),
            Err(SourceError::Exhausted)
        ));
    }
}
