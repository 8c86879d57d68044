//! Core domain types and query engine for geomarket.
//!
//! The crate models a read-only collection of geographic records
//! ([`GeoRecord`]: binary-encoded polygon plus envelope and attributes),
//! indexes their envelopes in a [`QuadTree`], and exposes the two query
//! operations of the [`GeoProvider`] trait: bounding-box intersection and
//! exact point containment. Backing stores implement the same trait
//! independently; [`MemoryProvider`] is the in-memory one.

pub mod memory;
pub mod provider;
pub mod quadtree;
pub mod record;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod wkb;

pub use memory::MemoryProvider;
pub use provider::{GeoProvider, QueryError, query_envelope};
pub use quadtree::QuadTree;
pub use record::{Attributes, GeoRecord};
pub use wkb::WkbError;
