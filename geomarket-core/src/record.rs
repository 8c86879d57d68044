//! Geographic record model.

use std::collections::HashMap;

use geo::{BoundingRect, Polygon, Rect};
use serde_json::Value;

use crate::wkb::{self, WkbError};

/// Attribute map attached to a [`GeoRecord`].
///
/// Values are JSON so heterogeneous backing stores (database columns,
/// generated data) share one representation.
pub type Attributes = HashMap<String, Value>;

/// A geographic item: binary-encoded polygon, its envelope, and attributes.
///
/// Records are immutable once constructed; a provider "refresh" rebuilds the
/// whole record set rather than mutating in place.
///
/// # Examples
///
/// ```
/// use geo::{LineString, Polygon};
/// use geomarket_core::{Attributes, GeoRecord};
///
/// let square = Polygon::new(
///     LineString::from(vec![(2.0, 2.0), (5.0, 2.0), (5.0, 6.0), (2.0, 6.0), (2.0, 2.0)]),
///     Vec::new(),
/// );
/// let record = GeoRecord::from_polygon(7, &square, Attributes::new()).unwrap();
/// assert_eq!(record.envelope.min().x, 2.0);
/// assert_eq!(record.envelope.max().y, 6.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRecord {
    /// Identifier, unique within one provider instance.
    pub id: u64,
    /// Geometry as well-known binary (see [`crate::wkb`]).
    pub wkb: Vec<u8>,
    /// Tightest axis-aligned box containing every ring vertex.
    pub envelope: Rect<f64>,
    /// Attribute values keyed by name. Query results carry only the
    /// attributes the caller asked for.
    pub attributes: Attributes,
}

impl GeoRecord {
    /// Construct a record from already-encoded parts.
    ///
    /// The caller is responsible for `envelope` matching the geometry in
    /// `wkb`; backing stores that persist precomputed envelope columns use
    /// this constructor directly.
    pub fn new(id: u64, wkb: Vec<u8>, envelope: Rect<f64>, attributes: Attributes) -> Self {
        Self {
            id,
            wkb,
            envelope,
            attributes,
        }
    }

    /// Encode `polygon` and derive the tightest envelope from its vertices.
    ///
    /// # Errors
    ///
    /// Returns [`WkbError::EmptyPolygon`] when the polygon has no vertices
    /// to take an envelope from.
    pub fn from_polygon(
        id: u64,
        polygon: &Polygon<f64>,
        attributes: Attributes,
    ) -> Result<Self, WkbError> {
        let envelope = polygon.bounding_rect().ok_or(WkbError::EmptyPolygon)?;
        Ok(Self::new(id, wkb::encode_polygon(polygon), envelope, attributes))
    }

    /// Decode the stored geometry.
    ///
    /// # Errors
    ///
    /// Returns the codec error when the stored bytes are corrupt.
    pub fn polygon(&self) -> Result<Polygon<f64>, WkbError> {
        wkb::decode_polygon(&self.wkb)
    }

    /// Clone the record keeping only the requested attribute names.
    ///
    /// Names the record does not carry are omitted, not errors.
    pub(crate) fn project_attributes(&self, names: &[String]) -> Self {
        let attributes = names
            .iter()
            .filter_map(|name| {
                self.attributes
                    .get_key_value(name)
                    .map(|(key, value)| (key.clone(), value.clone()))
            })
            .collect();
        Self {
            id: self.id,
            wkb: self.wkb.clone(),
            envelope: self.envelope,
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{square_record, square_with_hole};
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn envelope_ignores_holes() {
        let record = GeoRecord::from_polygon(1, &square_with_hole(), Attributes::new())
            .expect("valid polygon");
        assert_eq!(record.envelope.min().x, 0.0);
        assert_eq!(record.envelope.min().y, 0.0);
        assert_eq!(record.envelope.max().x, 10.0);
        assert_eq!(record.envelope.max().y, 10.0);
    }

    #[rstest]
    fn decodes_back_to_the_source_polygon() {
        let polygon = square_with_hole();
        let record =
            GeoRecord::from_polygon(1, &polygon, Attributes::new()).expect("valid polygon");
        assert_eq!(record.polygon().expect("decode"), polygon);
    }

    #[rstest]
    fn projection_keeps_only_requested_names() {
        let mut record = square_record(1, 0.0, 0.0, "alpha");
        record
            .attributes
            .insert(String::from("value"), json!(42.5));

        let projected = record.project_attributes(&[String::from("value")]);
        assert_eq!(projected.attributes.len(), 1);
        assert_eq!(projected.attributes.get("value"), Some(&json!(42.5)));
        // Identity fields survive the projection untouched.
        assert_eq!(projected.id, record.id);
        assert_eq!(projected.wkb, record.wkb);
    }

    #[rstest]
    fn projection_omits_unknown_names() {
        let record = square_record(1, 0.0, 0.0, "alpha");
        let projected = record.project_attributes(&[String::from("missing")]);
        assert!(projected.attributes.is_empty());
    }
}
