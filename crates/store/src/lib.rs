//! Relational store adapter.
//!
//! The catalog read-model never talks to a database driver directly. It
//! issues parameterized read commands through the [`Store`] trait and gets
//! rows back as mappings of column name to scalar [`Value`]. Two logical
//! handles are expected at runtime (catalog and metadata); which one serves
//! a given entity is decided by the caller, not by this crate.

pub mod backend;
pub mod error;
mod value;

pub use crate::backend::{Autocommit, Executor, Store, Transaction};
pub use crate::value::{Row, Value};
use std::sync::Arc;

pub type StoreHandle = Arc<dyn Store + Send + Sync>;
