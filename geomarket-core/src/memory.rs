//! In-memory provider backed by a quad-tree snapshot.
//!
//! The record set and its index live together in an immutable snapshot
//! behind an `Arc`. A [`MemoryProvider::refresh`] builds a new snapshot and
//! publishes it atomically; query iterators hold their own `Arc`, so a
//! query started before a refresh completes entirely against the snapshot
//! it began with. Queries are pure reads and the provider is `Send + Sync`.

use std::sync::{Arc, PoisonError, RwLock};

use geo::{Coord, Rect};
use log::warn;

use crate::provider::{GeoProvider, QueryError, query_envelope};
use crate::quadtree::QuadTree;
use crate::record::GeoRecord;
use crate::wkb;

#[derive(Debug)]
struct Snapshot {
    records: Vec<GeoRecord>,
    tree: QuadTree<usize>,
}

impl Snapshot {
    fn build(records: Vec<GeoRecord>) -> Self {
        let bounds = records
            .iter()
            .map(|record| record.envelope)
            .reduce(merge_envelopes)
            .unwrap_or_else(|| Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 0.0 }));
        let tree = QuadTree::bulk(
            bounds,
            records
                .iter()
                .enumerate()
                .map(|(index, record)| (record.envelope, index)),
        );
        Self { records, tree }
    }
}

fn merge_envelopes(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

/// In-memory [`GeoProvider`] over a rebuildable record set.
///
/// # Examples
///
/// ```
/// use geomarket_core::{GeoProvider, GeoRecord, MemoryProvider};
/// use geo::{LineString, Polygon};
///
/// let square = Polygon::new(
///     LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]),
///     Vec::new(),
/// );
/// let record = GeoRecord::from_polygon(1, &square, Default::default()).unwrap();
/// let provider = MemoryProvider::new([record]);
///
/// let found: Vec<_> = provider.query_bbox(1.0, 1.0, 3.0, 3.0, &[]).unwrap().collect();
/// assert_eq!(found.len(), 1);
/// assert!(provider.query_point(1.0, 1.0, &[]).unwrap().next().is_some());
/// ```
#[derive(Debug)]
pub struct MemoryProvider {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl MemoryProvider {
    /// Build a provider and its index from a record collection.
    pub fn new<I>(records: I) -> Self
    where
        I: IntoIterator<Item = GeoRecord>,
    {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::build(records.into_iter().collect()))),
        }
    }

    /// Discard the current record set and index and install a new one.
    ///
    /// The new snapshot is published atomically. Iterators obtained before
    /// the call keep the snapshot they started with and finish against it;
    /// they never observe a mix of old and new records.
    pub fn refresh<I>(&self, records: I)
    where
        I: IntoIterator<Item = GeoRecord>,
    {
        let snapshot = Arc::new(Snapshot::build(records.into_iter().collect()));
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Number of records in the current snapshot.
    pub fn len(&self) -> usize {
        self.current().records.len()
    }

    /// True when the current snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl GeoProvider for MemoryProvider {
    fn query_bbox(
        &self,
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
        attributes: &[String],
    ) -> Result<Box<dyn Iterator<Item = GeoRecord> + Send + '_>, QueryError> {
        let envelope = query_envelope(xmin, ymin, xmax, ymax)?;
        let snapshot = self.current();
        let matches: Vec<usize> = snapshot.tree.query(envelope).copied().collect();
        Ok(Box::new(SnapshotIter {
            snapshot,
            matches: matches.into_iter(),
            attributes: attributes.to_vec(),
        }))
    }
}

/// Yields records from one snapshot.
///
/// Owns its `Arc`, keeping the snapshot alive across a concurrent
/// [`MemoryProvider::refresh`].
struct SnapshotIter {
    snapshot: Arc<Snapshot>,
    matches: std::vec::IntoIter<usize>,
    attributes: Vec<String>,
}

impl Iterator for SnapshotIter {
    type Item = GeoRecord;

    fn next(&mut self) -> Option<GeoRecord> {
        loop {
            let index = self.matches.next()?;
            let record = &self.snapshot.records[index];
            if let Err(error) = wkb::validate(&record.wkb) {
                warn!(
                    "skipping record {id}: undecodable geometry: {error}",
                    id = record.id
                );
                continue;
            }
            return Some(record.project_attributes(&self.attributes));
        }
    }
}
