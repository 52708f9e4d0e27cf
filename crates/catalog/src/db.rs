//! Opening and migrating the two SQLite stores behind the catalog.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use folio_config::{Config, StoreConfig};
use folio_store::backend::{SqliteSettings, SqliteStore};
use tracing::instrument;

/// Items, facets, join tables and reviews.
static CATALOG_MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/catalog");
/// Free-form per-item metadata.
static METADATA_MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/metadata");

/// Both store handles, connected and migrated.
///
/// This is the main entry point for standing up a catalog from
/// configuration; wrap it in a [`Catalog`](crate::Catalog) to query it.
#[derive(Debug, Clone)]
pub struct Database {
    pub catalog: SqliteStore,
    pub metadata: SqliteStore,
}

impl Database {
    /// Connect to both stores as configured, creating database files that
    /// don't exist yet, and run migrations.
    #[instrument("connecting catalog stores", skip(config), fields(catalog = %config.catalog.path.display()))]
    pub async fn connect(config: &Config) -> Result<Self> {
        let catalog = SqliteStore::connect("catalog", &config.catalog.path, settings(&config.catalog))
            .await
            .or_raise(|| ErrorKind::Connect)?;
        let metadata = SqliteStore::connect("metadata", &config.metadata.path, settings(&config.metadata))
            .await
            .or_raise(|| ErrorKind::Connect)?;
        let db = Self { catalog, metadata };
        db.migrate().await?;
        Ok(db)
    }

    /// Connect to two fresh in-memory stores (useful for testing).
    ///
    /// Do NOT apply `#[cfg(test)]` so that dependent crates can use this in
    /// their tests too.
    pub async fn connect_in_memory() -> Result<Self> {
        let catalog = SqliteStore::connect_in_memory("catalog").await.or_raise(|| ErrorKind::Connect)?;
        let metadata = SqliteStore::connect_in_memory("metadata").await.or_raise(|| ErrorKind::Connect)?;
        let db = Self { catalog, metadata };
        db.migrate().await?;
        Ok(db)
    }

    /// Run migrations on both stores.
    ///
    /// Called automatically on connect; running it again is a no-op.
    pub async fn migrate(&self) -> Result<()> {
        self.catalog.migrate(&CATALOG_MIGRATOR).await.or_raise(|| ErrorKind::Connect)?;
        self.metadata.migrate(&METADATA_MIGRATOR).await.or_raise(|| ErrorKind::Connect)?;
        Ok(())
    }

    pub async fn close(&self) {
        self.catalog.close().await;
        self.metadata.close().await;
    }
}

fn settings(config: &StoreConfig) -> SqliteSettings {
    SqliteSettings {
        max_connections: config.max_connections,
        busy_timeout: config.busy_timeout(),
    }
}
