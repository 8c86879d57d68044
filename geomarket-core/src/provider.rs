//! Query façade over geographic record collections.
//!
//! [`GeoProvider`] is the capability interface rendering and selection
//! consumers program against. Each backing store (in-memory, database row
//! source, …) implements it independently; there is no shared base type.

use geo::{Contains, Coord, Point, Rect};
use log::warn;
use thiserror::Error;

use crate::record::GeoRecord;
use crate::wkb;

/// Errors raised by provider queries.
///
/// "No results" is never an error: queries yield empty iterators instead.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The query envelope contained NaN or infinite ordinates.
    #[error("query envelope has a non-finite ordinate: ({xmin}, {ymin})..({xmax}, {ymax})")]
    NonFiniteEnvelope {
        /// Minimum x ordinate as supplied by the caller.
        xmin: f64,
        /// Minimum y ordinate as supplied by the caller.
        ymin: f64,
        /// Maximum x ordinate as supplied by the caller.
        xmax: f64,
        /// Maximum y ordinate as supplied by the caller.
        ymax: f64,
    },
    /// The backing store failed while answering the query.
    ///
    /// The source error is passed through unchanged for the embedding
    /// application to inspect.
    #[error("backing store failed during query")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl QueryError {
    /// Wrap a backing-store error for pass-through to the caller.
    pub fn backend<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(source))
    }
}

/// Normalise four query ordinates into an axis-aligned rectangle.
///
/// Inverted corners are reordered and degenerate (zero-area) boxes pass
/// through unchanged; only non-finite ordinates are rejected.
///
/// # Errors
///
/// Returns [`QueryError::NonFiniteEnvelope`] when any ordinate is NaN or
/// infinite.
///
/// # Examples
///
/// ```
/// use geomarket_core::query_envelope;
///
/// // Inverted corners are reordered, not rejected.
/// let envelope = query_envelope(7.0, 3.0, 2.0, 1.0).unwrap();
/// assert_eq!(envelope.min().x, 2.0);
/// assert_eq!(envelope.max().y, 3.0);
///
/// assert!(query_envelope(f64::NAN, 0.0, 1.0, 1.0).is_err());
/// ```
pub fn query_envelope(
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
) -> Result<Rect<f64>, QueryError> {
    if !(xmin.is_finite() && ymin.is_finite() && xmax.is_finite() && ymax.is_finite()) {
        return Err(QueryError::NonFiniteEnvelope {
            xmin,
            ymin,
            xmax,
            ymax,
        });
    }
    // Rect::new orders the corners itself.
    Ok(Rect::new(Coord { x: xmin, y: ymin }, Coord { x: xmax, y: ymax }))
}

/// Capability interface for geographic data sources.
///
/// Providers are stateless with respect to queries: repeated identical
/// queries return identical results until the underlying record set is
/// rebuilt. Queries are pure reads; rebuilds must be serialised against
/// them by publishing a new snapshot (see
/// [`MemoryProvider`](crate::MemoryProvider)).
///
/// # Examples
///
/// A linear-scan implementation over a plain vector:
///
/// ```
/// use geo::{Intersects, LineString, Polygon};
/// use geomarket_core::{Attributes, GeoProvider, GeoRecord, QueryError, query_envelope};
///
/// struct ScanProvider {
///     records: Vec<GeoRecord>,
/// }
///
/// impl GeoProvider for ScanProvider {
///     fn query_bbox(
///         &self,
///         xmin: f64,
///         ymin: f64,
///         xmax: f64,
///         ymax: f64,
///         _attributes: &[String],
///     ) -> Result<Box<dyn Iterator<Item = GeoRecord> + Send + '_>, QueryError> {
///         let envelope = query_envelope(xmin, ymin, xmax, ymax)?;
///         Ok(Box::new(
///             self.records
///                 .iter()
///                 .filter(move |record| envelope.intersects(&record.envelope))
///                 .cloned(),
///         ))
///     }
/// }
///
/// let square = Polygon::new(
///     LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]),
///     Vec::new(),
/// );
/// let provider = ScanProvider {
///     records: vec![GeoRecord::from_polygon(1, &square, Attributes::new()).unwrap()],
/// };
///
/// let found: Vec<_> = provider.query_bbox(1.0, 1.0, 2.0, 2.0, &[]).unwrap().collect();
/// assert_eq!(found.len(), 1);
/// ```
pub trait GeoProvider {
    /// Every record whose envelope intersects the bounding box.
    ///
    /// This is a coarse filter: intersection is tested against stored
    /// envelopes only, under closed-interval semantics, so the result may
    /// include records whose exact geometry misses the box. Callers that
    /// need exact containment must test the decoded geometry themselves.
    ///
    /// When `attributes` is non-empty, each returned record carries the
    /// requested attribute values; names the store cannot supply are
    /// omitted. Result order is unspecified.
    ///
    /// # Errors
    ///
    /// [`QueryError::NonFiniteEnvelope`] for NaN/infinite ordinates;
    /// [`QueryError::Backend`] when the backing store fails. A record with
    /// corrupt geometry bytes is skipped with a logged warning instead of
    /// failing the query.
    fn query_bbox(
        &self,
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
        attributes: &[String],
    ) -> Result<Box<dyn Iterator<Item = GeoRecord> + Send + '_>, QueryError>;

    /// Every record whose decoded geometry contains the point.
    ///
    /// Unlike [`GeoProvider::query_bbox`] this is exact: candidates come
    /// from a degenerate bounding-box query at `(x, y)` and are then kept
    /// only when the decoded polygon contains the point (holes subtract;
    /// boundary points do not count as contained).
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`GeoProvider::query_bbox`].
    fn query_point(
        &self,
        x: f64,
        y: f64,
        attributes: &[String],
    ) -> Result<Box<dyn Iterator<Item = GeoRecord> + Send + '_>, QueryError> {
        let point = Point::new(x, y);
        let candidates = self.query_bbox(x, y, x, y, attributes)?;
        Ok(Box::new(
            candidates.filter(move |record| record_contains(record, point)),
        ))
    }
}

/// Exact containment test against a record's decoded geometry.
///
/// A record whose geometry fails to decode drops out of the result set
/// with a diagnostic rather than aborting the query.
fn record_contains(record: &GeoRecord, point: Point<f64>) -> bool {
    match wkb::decode_polygon(&record.wkb) {
        Ok(polygon) => polygon.contains(&point),
        Err(error) => {
            warn!(
                "skipping record {id}: undecodable geometry: {error}",
                id = record.id
            );
            false
        }
    }
}
