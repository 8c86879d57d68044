//! Facade crate for the geomarket spatial query engine.
//!
//! This crate re-exports the core record model, geometry codec, spatial
//! index, and provider trait, and exposes the concrete backing stores
//! behind feature flags.

#![forbid(unsafe_code)]

pub use geomarket_core::{
    Attributes, GeoProvider, GeoRecord, MemoryProvider, QuadTree, QueryError, WkbError,
    query_envelope, wkb,
};

#[cfg(feature = "store-sqlite")]
pub use geomarket_data::{
    DonutConfig, SqliteProvider, SqliteProviderError, TableMapping, generate_donuts, write_table,
};
