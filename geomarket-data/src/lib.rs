//! Backing stores for the geomarket query engine.
//!
//! Each store implements the [`geomarket_core::GeoProvider`] contract
//! independently: [`SqliteProvider`] maps a database table onto records the
//! way the classic geomarketing samples did, and [`generate_donuts`]
//! produces the synthetic in-memory data set used by demos and load tests.

pub mod donuts;
pub mod sqlite;

pub use donuts::{DonutConfig, generate_donuts};
pub use sqlite::{SqliteProvider, SqliteProviderError, TableMapping, write_table};
