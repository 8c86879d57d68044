//! Synthetic donut-shaped records for demos and load tests.
//!
//! Each record is a rotated ellipse shell with a concentric hole. Shapes
//! are computed in a spherical-Mercator plane so the radii are metric and
//! angles are preserved, scaled by `1/cos(lat)` to keep their ground size,
//! then stored as WGS84 rings.

use std::f64::consts::PI;

use geo::{Coord, LineString, Polygon};
use geomarket_core::{Attributes, GeoRecord, WkbError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::json;

/// Spherical-Mercator earth radius, metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Parameters for the synthetic donut set.
#[derive(Debug, Clone)]
pub struct DonutConfig {
    /// Number of records to generate.
    pub count: usize,
    /// Seed for the deterministic generator.
    pub seed: u64,
    /// Vertices approximating each ring.
    pub vertices: usize,
    /// Western and eastern longitude limits, degrees.
    pub lon_range: (f64, f64),
    /// Southern and northern latitude limits, degrees.
    pub lat_range: (f64, f64),
    /// Minimum and maximum ellipse radius, metres.
    pub radius_range: (f64, f64),
    /// Ring thickness between shell and hole, metres.
    pub buffer: f64,
}

impl Default for DonutConfig {
    fn default() -> Self {
        Self {
            count: 10_000,
            seed: 0,
            vertices: 100,
            lon_range: (5.0, 11.0),
            lat_range: (47.0, 51.0),
            radius_range: (1_000.0, 3_000.0),
            buffer: 1_000.0,
        }
    }
}

/// Generate `config.count` donut records.
///
/// Deterministic: identical configurations produce identical records. Each
/// record carries a random `"value"` attribute in `0..100` for thematic
/// queries to project.
///
/// # Errors
///
/// Propagates the codec error if a generated polygon cannot be encoded;
/// with sane radii this does not happen.
pub fn generate_donuts(config: &DonutConfig) -> Result<Vec<GeoRecord>, WkbError> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut records = Vec::with_capacity(config.count);

    for index in 0..config.count {
        let lon = rng.gen_range(config.lon_range.0..config.lon_range.1);
        let lat = rng.gen_range(config.lat_range.0..config.lat_range.1);
        let rotation = rng.gen_range(0.0..PI);
        let radius_x = rng.gen_range(config.radius_range.0..config.radius_range.1);
        let radius_y = rng.gen_range(config.radius_range.0..config.radius_range.1);
        let value = rng.gen_range(0.0..100.0);

        // The conformal projection stretches distances by 1/cos(lat);
        // scale the metric radii so the shapes keep their ground size.
        let scale = 1.0 / lat.to_radians().cos();
        let radius_x = radius_x * scale;
        let radius_y = radius_y * scale;
        let buffer = config.buffer * scale;

        let centre = wgs_to_mercator(Coord { x: lon, y: lat });
        let shell = ellipse_ring(centre, radius_x, radius_y, rotation, config.vertices);
        let hole = ellipse_ring(
            centre,
            radius_x - buffer,
            radius_y - buffer,
            rotation,
            config.vertices,
        );
        let polygon = Polygon::new(shell, vec![hole]);

        let attributes = Attributes::from([(String::from("value"), json!(value))]);
        records.push(GeoRecord::from_polygon(index as u64, &polygon, attributes)?);
    }
    Ok(records)
}

/// Closed ring of a rotated ellipse, converted back to WGS84 degrees.
fn ellipse_ring(
    centre: Coord<f64>,
    radius_x: f64,
    radius_y: f64,
    rotation: f64,
    vertices: usize,
) -> LineString<f64> {
    let step = 2.0 * PI / vertices as f64;
    let (sin_rot, cos_rot) = rotation.sin_cos();

    let mut coords = Vec::with_capacity(vertices + 1);
    for vertex in 0..vertices {
        let arc = step * vertex as f64;
        let along = radius_x * arc.cos();
        let across = radius_y * arc.sin();
        coords.push(mercator_to_wgs(Coord {
            x: centre.x + along * cos_rot - across * sin_rot,
            y: centre.y + along * sin_rot + across * cos_rot,
        }));
    }
    let first = coords[0];
    coords.push(first);
    LineString::new(coords)
}

/// WGS84 degrees to spherical-Mercator metres.
fn wgs_to_mercator(wgs: Coord<f64>) -> Coord<f64> {
    Coord {
        x: EARTH_RADIUS_M * wgs.x.to_radians(),
        y: EARTH_RADIUS_M * (PI / 4.0 + wgs.y.to_radians() / 2.0).tan().ln(),
    }
}

/// Spherical-Mercator metres back to WGS84 degrees.
fn mercator_to_wgs(mercator: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (mercator.x / EARTH_RADIUS_M).to_degrees(),
        y: (2.0 * (mercator.y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees(),
    }
}
