//! SQLite store backed by an `sqlx` connection pool.

use super::{Executor, Store, Transaction};
use crate::error::{ErrorKind, Result, SqlxResultExt};
use crate::{Row, Value};
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::migrate::Migrator;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteAutoVacuum, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow, SqliteSynchronous,
};
use sqlx::{Column, Row as _, Sqlite, SqliteConnection, TypeInfo, ValueRef};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

/// Pool tuning for one SQLite store handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqliteSettings {
    pub max_connections: u32,
    /// How long a connection waits on `SQLITE_BUSY` before the command fails
    /// as unavailable.
    pub busy_timeout: Duration,
}
impl Default for SqliteSettings {
    fn default() -> Self {
        Self {
            // Read-heavy, mostly I/O-bound: 5-ish.
            max_connections: 5,
            busy_timeout: Duration::from_millis(1500),
        }
    }
}

/// SQLite connection pool exposed as a [`Store`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    name: String,
    pool: SqlitePool,
}

impl SqliteStore {
    async fn new(name: String, options: SqliteConnectOptions, max: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Apply the query-based PRAGMAs to EVERY connection in the pool,
            // not only the first one handed out.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max)
            .connect_with(options)
            .await
            .or_classify(&name)?;
        tracing::debug!(store = %name, max_connections = max, "Opened SQLite store");
        Ok(Self { name, pool })
    }

    /// Connect to the database file at the given path, creating it if it
    /// doesn't exist.
    pub async fn connect(name: impl Into<String>, path: impl AsRef<Path>, settings: SqliteSettings) -> Result<Self> {
        let options = Self::base_options(settings.busy_timeout).filename(path.as_ref()).create_if_missing(true);
        Self::new(name.into(), options, settings.max_connections).await
    }

    /// Connect to an in-memory database (useful for testing).
    ///
    /// Note:
    /// - In-memory databases are destroyed when the connection closes.
    /// - Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub async fn connect_in_memory(name: impl Into<String>) -> Result<Self> {
        let options = Self::base_options(SqliteSettings::default().busy_timeout).filename(":memory:");
        // Without a shared cache, every pooled connection would open its own
        // empty database. One connection keeps everyone on the same data.
        Self::new(name.into(), options, 1).await
    }

    fn base_options(busy_timeout: Duration) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // WAL gives readers a stable snapshot per transaction.
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(busy_timeout)
            .auto_vacuum(SqliteAutoVacuum::None)
    }

    /// Apply additional PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA cache_size = -8192;
                PRAGMA temp_store = MEMORY;
                PRAGMA mmap_size = 33554432;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Run embedded migrations against this store.
    #[instrument("performing store migrations", skip(self, migrator), fields(store = %self.name))]
    pub async fn migrate(&self, migrator: &Migrator) -> Result<()> {
        migrator.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool, waiting for checked-out connections to be
    /// returned first.
    pub async fn close(&self) {
        // Let SQLite update query planner statistics
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

fn prepare<'q>(command: &'q str, params: &'q [Value]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    params.iter().fold(sqlx::query(command), |query, value| match value {
        Value::Null => query.bind(None::<i64>),
        Value::Integer(i) => query.bind(*i),
        Value::Real(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.as_str()),
        Value::Blob(b) => query.bind(b.as_slice()),
    })
}

/// SQLite is dynamically typed, so the storage class of each value (not the
/// declared column type) decides how it is decoded.
fn decode(store: &str, row: &SqliteRow) -> Result<Row> {
    let mut decoded = Row::default();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index).or_classify(store)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_info = raw.type_info();
            match type_info.name() {
                "INTEGER" | "BOOLEAN" => Value::Integer(row.try_get_unchecked::<i64, _>(index).or_classify(store)?),
                "REAL" | "NUMERIC" => Value::Real(row.try_get_unchecked::<f64, _>(index).or_classify(store)?),
                "BLOB" => Value::Blob(row.try_get_unchecked::<Vec<u8>, _>(index).or_classify(store)?),
                _ => Value::Text(row.try_get_unchecked::<String, _>(index).or_classify(store)?),
            }
        };
        decoded.insert(column.name(), value);
    }
    Ok(decoded)
}

fn decode_all(store: &str, rows: Vec<SqliteRow>) -> Result<Vec<Row>> {
    rows.iter().map(|row| decode(store, row)).collect()
}

#[async_trait]
impl Store for SqliteStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "debug", skip(self, command, params), fields(store = %self.name, params = params.len()))]
    async fn execute(&self, command: &str, params: &[Value]) -> Result<Vec<Row>> {
        tracing::trace!(command, "Executing command");
        let rows = prepare(command, params).fetch_all(&self.pool).await.or_classify(&self.name)?;
        decode_all(&self.name, rows)
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let tx = self.pool.begin().await.or_classify(&self.name)?;
        Ok(Box::new(SqliteTransaction { name: self.name.clone(), tx }))
    }
}

/// An open transaction on a [`SqliteStore`].
///
/// SQLite transactions are serializable: once the first read has run, every
/// later read in the same transaction sees the same snapshot.
pub struct SqliteTransaction {
    name: String,
    tx: sqlx::Transaction<'static, Sqlite>,
}

#[async_trait]
impl Executor for SqliteTransaction {
    #[instrument(level = "debug", skip(self, command, params), fields(store = %self.name, params = params.len()))]
    async fn fetch_all(&mut self, command: &str, params: &[Value]) -> Result<Vec<Row>> {
        tracing::trace!(command, "Executing command in transaction");
        let rows = prepare(command, params).fetch_all(&mut *self.tx).await.or_classify(&self.name)?;
        decode_all(&self.name, rows)
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let SqliteTransaction { name, tx } = *self;
        tx.commit().await.or_classify(&name)
    }
}
