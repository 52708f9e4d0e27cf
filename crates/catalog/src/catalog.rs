use crate::db::Database;
use crate::registry::StoreRole;
use folio_config::QueryConfig;
use folio_store::StoreHandle;
use std::sync::Arc;

/// One store handle per logical store.
#[derive(Clone)]
pub struct Stores {
    pub catalog: StoreHandle,
    pub metadata: StoreHandle,
}

impl From<&Database> for Stores {
    fn from(db: &Database) -> Self {
        Self {
            catalog: Arc::new(db.catalog.clone()),
            metadata: Arc::new(db.metadata.clone()),
        }
    }
}

/// Read-model over the catalog.
///
/// Cheap to clone; every clone shares the same store handles. Holds no state
/// between calls besides its configuration.
#[derive(Clone)]
pub struct Catalog {
    stores: Stores,
    options: QueryConfig,
}

impl Catalog {
    pub fn new(stores: Stores, options: QueryConfig) -> Self {
        Self { stores, options }
    }

    pub fn with_options(mut self, options: QueryConfig) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> QueryConfig {
        self.options
    }

    pub(crate) fn store(&self, role: StoreRole) -> &StoreHandle {
        match role {
            StoreRole::Catalog => &self.stores.catalog,
            StoreRole::Metadata => &self.stores.metadata,
        }
    }
}

impl From<&Database> for Catalog {
    fn from(db: &Database) -> Self {
        Self::new(Stores::from(db), QueryConfig::default())
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("catalog", &self.stores.catalog.name())
            .field("metadata", &self.stores.metadata.name())
            .field("options", &self.options)
            .finish()
    }
}
