//! Store trait and implementations.
//!
//! This module defines the [`Store`] trait, the one capability the catalog
//! read-model consumes: run a parameterized read command and hand back rows.
//! Commands are plain SQL text with positional placeholders; every variable
//! part travels as a bound [`Value`], never by string interpolation.

#[cfg(feature = "mock")]
mod mock;
mod sqlite;

#[cfg(feature = "mock")]
pub use self::mock::MockStore;
pub use self::sqlite::{SqliteSettings, SqliteStore, SqliteTransaction};
use crate::error::Result;
use crate::{Row, Value};
use async_trait::async_trait;

/// Anything commands can be run against: a pooled store, or an open
/// transaction on one.
#[async_trait]
pub trait Executor: Send {
    async fn fetch_all(&mut self, command: &str, params: &[Value]) -> Result<Vec<Row>>;
}

/// A unit of work pinned to one connection.
///
/// Dropping a transaction without calling [`commit`](Self::commit) rolls it
/// back. The catalog read-model only reads, so the difference matters for
/// isolation, not for durability.
#[async_trait]
pub trait Transaction: Executor {
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Unified interface for relational stores.
///
/// # Examples
///
/// ```no_run
/// use folio_store::{Store, Value, error::Result};
///
/// async fn count_books(store: &dyn Store) -> Result<i64> {
///     let rows = store.execute("SELECT COUNT(*) AS n FROM books WHERE id > ?1", &[Value::Integer(0)]).await?;
///     match rows.first() {
///         Some(row) => row.try_i64("n"),
///         None => Ok(0),
///     }
/// }
/// ```
#[async_trait]
pub trait Store: Send + Sync {
    /// Name of the store handle (used for logging and error messages only).
    fn name(&self) -> &str;

    /// Run one command outside of any explicit transaction.
    async fn execute(&self, command: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Begin a transaction. Every command run through the returned handle
    /// observes the same snapshot of the store until it is committed or
    /// dropped.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}

/// Runs each command directly on a [`Store`], with no surrounding
/// transaction. Consecutive commands may observe different store states.
pub struct Autocommit<'a>(pub &'a (dyn Store + Send + Sync));

#[async_trait]
impl Executor for Autocommit<'_> {
    async fn fetch_all(&mut self, command: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.0.execute(command, params).await
    }
}
