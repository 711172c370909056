use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "driftwatch.toml";

/// Prefix for environment overrides, e.g. `DRIFTWATCH__DATABASE__DSN`
pub const ENV_PREFIX: &str = "DRIFTWATCH__";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// DSN of the metadata catalog (PostgreSQL in production, SQLite for local runs)
    pub dsn: String,
    /// Upper bound on pooled connections. The reconciler only ever uses one at a time.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: String::from("postgres://postgres@localhost:5432/catalog"),
            max_connections: 1,
        }
    }
}

/// Object storage configuration.
///
/// The DSN names the storage endpoint only. Bucket names come from the
/// catalog's dataset locations, one store is built per bucket.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `s3://[access_key:secret_key@]host[:port]`, `memory://` or `file:///root`
    pub dsn: String,
    /// Number of keys requested per listing page
    pub page_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dsn: String::from("s3://s3.amazonaws.com"),
            page_size: 1000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Only objects with this suffix take part in the comparison
    pub object_extension: String,
    /// Trailing time buckets of the current day that are still open for writes
    pub in_flight_buckets: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            object_extension: String::from(".orc"),
            in_flight_buckets: 2,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report file, opened in append mode
    pub path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("drift-report.txt"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    /// Metadata catalog connection
    pub database: DatabaseConfig,
    /// Object storage endpoint and listing behaviour
    pub storage: StorageConfig,
    /// Comparison policy
    pub reconcile: ReconcileConfig,
    /// Report output
    pub report: ReportConfig,
}

impl Configuration {
    /// Load configuration from defaults, `driftwatch.toml` and the environment.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(Path::new(DEFAULT_CONFIG_FILE))
            .extract()
            .map_err(Box::new)
    }

    /// Load configuration from an explicit file, still honouring env overrides.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        Self::figment(path).extract().map_err(Box::new)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Reject configurations the reconciler cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.dsn.is_empty() {
            anyhow::bail!("Database DSN cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be positive");
        }

        if self.storage.dsn.is_empty() {
            anyhow::bail!("Storage DSN cannot be empty");
        }

        if self.storage.page_size == 0 {
            anyhow::bail!("storage.page_size must be positive");
        }

        if !self.reconcile.object_extension.starts_with('.') {
            anyhow::bail!(
                "reconcile.object_extension must start with '.', got '{}'",
                self.reconcile.object_extension
            );
        }

        if self.report.path.as_os_str().is_empty() {
            anyhow::bail!("report.path cannot be empty");
        }

        Ok(())
    }
}
