//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Store failures are raised as a new
//! frame on top of the store's own error tree, so the driver error is still
//! there for whoever prints the report.

use crate::registry::Facet;
use derive_more::{Display, Error};
use folio_store::error::Error as StoreError;

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The entity type name is not in the registry.
    #[display("unknown entity type: {_0}")]
    UnknownEntity(#[error(not(source))] String),
    /// A facet filter request named no facet ids at all.
    #[display("at least one facet filter must be provided")]
    NoFilterProvided,
    /// Transport or connection failure talking to a store.
    #[display("store unavailable")]
    StoreUnavailable,
    /// One facet lookup of an attachment view failed; no partial view exists.
    #[display("could not fetch {_0} attachments")]
    Aggregation(#[error(not(source))] Facet),
    /// The store refused a command (schema mismatch, malformed SQL).
    #[display("store rejected query")]
    Query,
    /// A row or argument could not be mapped to or from a model.
    #[display("invalid catalog data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    /// Opening or migrating the stores failed.
    #[display("could not open catalog stores")]
    Connect,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }

    /// Convert a store error into a catalog error, keeping the store's `Exn`
    /// frame as a child in the new error tree.
    #[track_caller]
    pub(crate) fn store(err: StoreError) -> Error {
        let kind = match err.is_retryable() {
            true => Self::StoreUnavailable,
            false => Self::Query,
        };
        err.raise(kind)
    }
}
