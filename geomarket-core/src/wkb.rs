//! Well-known-binary polygon codec.
//!
//! The byte layout is the standard WKB polygon encoding, so streams written
//! here round-trip against other WKB producers: a byte-order marker (`0x01`
//! little endian, `0x00` big endian), a `u32` geometry type (`3` for
//! polygons), a `u32` ring count, then per ring a `u32` point count followed
//! by `(x, y)` pairs of IEEE-754 doubles. The first ring is the exterior
//! shell; any further rings are holes. Rings must be closed (first point
//! equal to the last).
//!
//! Coordinates are copied verbatim in both directions; projections and
//! rounding are the caller's concern.

use geo::{Coord, LineString, Polygon};
use thiserror::Error;

const LITTLE_ENDIAN: u8 = 0x01;
const BIG_ENDIAN: u8 = 0x00;

/// WKB geometry type code for a polygon.
const POLYGON_CODE: u32 = 3;

/// A closed ring repeats its first point, so a triangle takes four points.
const MIN_RING_POINTS: usize = 4;

/// Error raised when a byte stream is not a structurally valid polygon.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WkbError {
    /// The stream ended before the declared ring and point counts were met.
    #[error("geometry stream ended early: needed {needed} more bytes, {remaining} left")]
    UnexpectedEof {
        /// Bytes the decoder still had to read.
        needed: usize,
        /// Bytes actually left in the stream.
        remaining: usize,
    },
    /// Bytes remained after the declared rings were fully read.
    #[error("{remaining} trailing bytes after the polygon payload")]
    TrailingBytes {
        /// Number of unread bytes.
        remaining: usize,
    },
    /// The leading byte-order marker was neither little nor big endian.
    #[error("unsupported byte-order marker {marker:#04x}")]
    UnsupportedByteOrder {
        /// Marker byte found at the start of the stream.
        marker: u8,
    },
    /// The stream encodes a geometry other than a polygon.
    #[error("unsupported geometry type code {code}; only polygons are handled")]
    UnsupportedGeometryType {
        /// Geometry type code found in the header.
        code: u32,
    },
    /// The polygon declares no rings at all.
    #[error("polygon declares no rings")]
    EmptyPolygon,
    /// A ring has too few points to be a closed boundary.
    #[error("ring {ring} has {points} points; a closed ring needs at least {MIN_RING_POINTS}")]
    ShortRing {
        /// Zero-based ring index (0 is the exterior shell).
        ring: usize,
        /// Declared point count.
        points: usize,
    },
    /// A ring's first and last points differ.
    #[error("ring {ring} is not closed (first and last points differ)")]
    UnclosedRing {
        /// Zero-based ring index (0 is the exterior shell).
        ring: usize,
    },
}

/// Encode a polygon as little-endian WKB.
///
/// Deterministic: identical ring data yields byte-identical output. The
/// exterior ring is written first, then each hole, preserving order.
///
/// # Examples
///
/// ```
/// use geo::{LineString, Polygon};
/// use geomarket_core::wkb;
///
/// let square = Polygon::new(
///     LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
///     Vec::new(),
/// );
/// let bytes = wkb::encode_polygon(&square);
/// assert_eq!(wkb::decode_polygon(&bytes).unwrap(), square);
/// ```
pub fn encode_polygon(polygon: &Polygon<f64>) -> Vec<u8> {
    let rings = 1 + polygon.interiors().len();
    let points: usize = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.0.len())
        .sum();

    let mut out = Vec::with_capacity(1 + 4 + 4 + rings * 4 + points * 16);
    out.push(LITTLE_ENDIAN);
    out.extend_from_slice(&POLYGON_CODE.to_le_bytes());
    out.extend_from_slice(&(rings as u32).to_le_bytes());
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        out.extend_from_slice(&(ring.0.len() as u32).to_le_bytes());
        for coord in ring.coords() {
            out.extend_from_slice(&coord.x.to_le_bytes());
            out.extend_from_slice(&coord.y.to_le_bytes());
        }
    }
    out
}

/// Decode a WKB polygon, accepting either byte order.
///
/// Fails when the declared ring or point counts do not match the available
/// bytes, when bytes trail the payload, or when a ring is open or too
/// short. See [`WkbError`] for the full taxonomy.
pub fn decode_polygon(bytes: &[u8]) -> Result<Polygon<f64>, WkbError> {
    let mut reader = Reader::new(bytes);
    let marker = reader.read_u8()?;
    reader.big_endian = match marker {
        BIG_ENDIAN => true,
        LITTLE_ENDIAN => false,
        other => return Err(WkbError::UnsupportedByteOrder { marker: other }),
    };

    let code = reader.read_u32()?;
    if code != POLYGON_CODE {
        return Err(WkbError::UnsupportedGeometryType { code });
    }

    let ring_count = reader.read_u32()? as usize;
    if ring_count == 0 {
        return Err(WkbError::EmptyPolygon);
    }

    let mut rings = Vec::new();
    for ring in 0..ring_count {
        let points = reader.read_u32()? as usize;
        if points < MIN_RING_POINTS {
            return Err(WkbError::ShortRing { ring, points });
        }
        let mut coords = Vec::with_capacity(points.min(reader.remaining() / 16 + 1));
        for _ in 0..points {
            let x = reader.read_f64()?;
            let y = reader.read_f64()?;
            coords.push(Coord { x, y });
        }
        if coords.first() != coords.last() {
            return Err(WkbError::UnclosedRing { ring });
        }
        rings.push(LineString::new(coords));
    }

    if reader.remaining() != 0 {
        return Err(WkbError::TrailingBytes {
            remaining: reader.remaining(),
        });
    }

    let mut rings = rings.into_iter();
    let exterior = rings.next().ok_or(WkbError::EmptyPolygon)?;
    Ok(Polygon::new(exterior, rings.collect()))
}

/// Structural check used by providers to skip corrupt records.
pub fn validate(bytes: &[u8]) -> Result<(), WkbError> {
    decode_polygon(bytes).map(|_| ())
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
    big_endian: bool,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            big_endian: false,
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], WkbError> {
        if needed > self.remaining() {
            return Err(WkbError::UnexpectedEof {
                needed,
                remaining: self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, WkbError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, WkbError> {
        let mut raw = [0_u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(if self.big_endian {
            u32::from_be_bytes(raw)
        } else {
            u32::from_le_bytes(raw)
        })
    }

    fn read_f64(&mut self) -> Result<f64, WkbError> {
        let mut raw = [0_u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(if self.big_endian {
            f64::from_be_bytes(raw)
        } else {
            f64::from_le_bytes(raw)
        })
    }
}
