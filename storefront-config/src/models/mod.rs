pub mod sources;

use std::path::PathBuf;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_REPAIR_PARALLELISM: usize = 1;
/// Pooled connections one product repair holds at once: its storage lock and
/// its queries.
pub const CONNECTIONS_PER_REPAIR: usize = 2;
pub const MIN_MAX_CONNECTIONS: u32 = 2;

/// Fully composed configuration for the catalog tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database: DatabaseConfig,
    pub repair: RepairConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn database_url(&self) -> Option<&str> {
        self.database
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Largest number of concurrent repairs the connection pool can serve.
    pub fn parallelism_limit(&self) -> usize {
        (self.database.max_connections as usize / CONNECTIONS_PER_REPAIR).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Connection URL with any resolved password already embedded.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairConfig {
    /// Products repaired concurrently by a full pass. Always >= 1.
    pub parallelism: usize,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_REPAIR_PARALLELISM,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
