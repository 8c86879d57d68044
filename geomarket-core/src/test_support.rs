//! Shared fixtures for unit tests and downstream crates' test suites.

use geo::{LineString, Polygon};
use serde_json::json;

use crate::record::{Attributes, GeoRecord};

/// 10×10 square shell with a 2×2 hole in the middle.
///
/// The point (5, 5) lies inside the hole but inside the bounding box;
/// (1, 1) lies inside the shell and outside the hole.
pub fn square_with_hole() -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (0.0, 0.0),
        ]),
        vec![LineString::from(vec![
            (4.0, 4.0),
            (6.0, 4.0),
            (6.0, 6.0),
            (4.0, 6.0),
            (4.0, 4.0),
        ])],
    )
}

/// Axis-aligned unit square with its lower-left corner at `(x, y)`.
pub fn unit_square(x: f64, y: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (x, y),
            (x + 1.0, y),
            (x + 1.0, y + 1.0),
            (x, y + 1.0),
            (x, y),
        ]),
        Vec::new(),
    )
}

/// Record for a unit square at `(x, y)` carrying a `"name"` attribute.
///
/// # Panics
///
/// Never in practice; the square is always a valid polygon.
pub fn square_record(id: u64, x: f64, y: f64, name: &str) -> GeoRecord {
    let attributes = Attributes::from([(String::from("name"), json!(name))]);
    GeoRecord::from_polygon(id, &unit_square(x, y), attributes).expect("unit square is valid")
}
