//! Configuration for the folio catalog read-model.
//!
//! Values are layered, later sources overriding earlier ones:
//! 1. built-in defaults,
//! 2. a TOML file (explicit path, or `folio.toml` in the user config directory),
//! 3. `FOLIO_`-prefixed environment variables, with `__` separating nested
//!    keys (`FOLIO_QUERY__CONSISTENCY=serializable`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "FOLIO_";
const CONFIG_FILE: &str = "folio.toml";

/// Whether the facet filter's default-fill lookups and its intersection query
/// share one transaction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Consistency {
    /// Separate round-trips; facet membership may change in between.
    #[default]
    ReadCommitted,
    /// One transaction around every round-trip of a filter request.
    Serializable,
}

/// How the per-facet lookups of an attachment view are scheduled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fanout {
    #[default]
    Concurrent,
    Sequential,
}

/// One logical store handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}
impl StoreConfig {
    fn in_data_dir(file: &str) -> Self {
        Self {
            path: default_data_dir().join(file),
            max_connections: 5,
            busy_timeout_ms: 1500,
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    pub consistency: Consistency,
    pub fanout: Fanout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Catalog store: items, facets, join tables, reviews.
    pub catalog: StoreConfig,
    /// Secondary metadata store.
    pub metadata: StoreConfig,
    #[serde(default)]
    pub query: QueryConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: StoreConfig::in_data_dir("catalog.sqlite"),
            metadata: StoreConfig::in_data_dir("metadata.sqlite"),
            query: QueryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, a TOML file and the environment.
    ///
    /// When `file` is `None`, `folio.toml` in the user's config directory is
    /// used if it exists.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = file.map(Path::to_path_buf).or_else(default_config_file);
        tracing::debug!(file = ?file, "Loading configuration");
        Self::from_figment(&Self::figment(file.as_deref()))
    }

    /// The layered sources, before extraction.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.catalog.max_connections == 0 {
            exn::bail!(ErrorKind::Invalid("catalog.max_connections"));
        }
        if self.metadata.max_connections == 0 {
            exn::bail!(ErrorKind::Invalid("metadata.max_connections"));
        }
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "folio")
}

/// Where the database files live unless configured otherwise.
pub fn default_data_dir() -> PathBuf {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf()).unwrap_or_else(|| PathBuf::from("."))
}

fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE)).filter(|path| path.is_file())
}
