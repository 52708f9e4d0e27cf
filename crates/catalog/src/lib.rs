//! Read-model over the folio book catalog.
//!
//! The catalog is normalized: books relate to five facet entities
//! (categories, tags, authors, publishers, translators) through one join
//! table per facet. This crate answers three questions on top of it:
//!
//! - **Which of these records changed since I last looked?** See
//!   [`Catalog::stale_ids`]. Timestamp based: a record is stale when its
//!   `modified_at` is strictly after the caller's `since`. No `since` means a
//!   cold cache, so everything is stale.
//! - **Which books match all of these facets at once?** See
//!   [`Catalog::find_by_facets`]. OR within a facet, AND across facets;
//!   omitted facets are filled with every id currently known for them.
//! - **What is attached to this book?** See [`Catalog::attachments`], which
//!   pulls all five facets for one book (optionally only what changed) and
//!   fails as a whole if any facet lookup fails.
//!
//! # Architecture
//! Every query goes through an injected [`folio_store::Store`], one handle per
//! logical store ([`StoreRole`]). The static [`registry`] describes each entity
//! type (table, key, timestamp, join relation), so none of the engines carry
//! per-type code.

mod attachments;
mod catalog;
mod changes;
mod db;
pub mod error;
mod filter;
mod listing;
mod models;
pub mod registry;

#[cfg(test)]
mod fixture;

pub use crate::attachments::{Attachments, FacetAttachments};
pub use crate::catalog::{Catalog, Stores};
pub use crate::db::Database;
pub use crate::filter::FacetFilter;
pub use crate::models::{FacetRecord, Id, Item, MetadataEntry, Page, Rating, Review};
pub use crate::registry::{EntityKind, Facet, StoreRole};
pub use folio_config::{Consistency, Fanout, QueryConfig};
