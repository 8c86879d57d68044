//! Error types emitted by the geomarket CLI.

use thiserror::Error;

/// Errors emitted by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Geometry generation or encoding failed.
    #[error(transparent)]
    Geometry(#[from] geomarket_core::WkbError),
    /// A provider query failed.
    #[error(transparent)]
    Query(#[from] geomarket_core::QueryError),
    /// The record database could not be opened or written.
    #[error(transparent)]
    Store(#[from] geomarket_data::SqliteProviderError),
    /// Neither `--bbox` nor `--point` was given to the query command.
    #[error("pass either --bbox or --point to select records")]
    MissingQueryTarget,
}
