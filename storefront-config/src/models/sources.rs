use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub repair: FileRepairConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileRepairConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub database_url: Option<String>,
    pub database_url_file: Option<PathBuf>,
    pub database_host: Option<String>,
    pub database_port: Option<u16>,
    pub database_user: Option<String>,
    pub database_name: Option<String>,
    pub database_password: Option<String>,
    pub database_password_file: Option<PathBuf>,
    pub database_max_connections: Option<u32>,
    pub repair_parallelism: Option<usize>,
}

impl EnvConfig {
    /// Snapshot the process environment.
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unparseable numbers are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |name: &str| lookup(name).map(PathBuf::from);
        Self {
            config_path: path("STOREFRONT_CONFIG"),
            database_url: lookup("DATABASE_URL"),
            database_url_file: path("DATABASE_URL_FILE"),
            database_host: lookup("DATABASE_HOST"),
            database_port: lookup("DATABASE_PORT").and_then(|s| s.trim().parse().ok()),
            database_user: lookup("DATABASE_USER"),
            database_name: lookup("DATABASE_NAME"),
            database_password: lookup("DATABASE_PASSWORD"),
            database_password_file: path("DATABASE_PASSWORD_FILE"),
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|s| s.trim().parse().ok()),
            repair_parallelism: lookup("REPAIR_PARALLELISM")
                .and_then(|s| s.trim().parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_parses_numbers_and_ignores_garbage() {
        let vars = HashMap::from([
            ("DATABASE_PORT", "6543"),
            ("REPAIR_PARALLELISM", "four"),
            ("DATABASE_MAX_CONNECTIONS", " 12 "),
            ("STOREFRONT_CONFIG", "/etc/storefront.toml"),
        ]);
        let env = EnvConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(env.database_port, Some(6543));
        assert_eq!(env.repair_parallelism, None);
        assert_eq!(env.database_max_connections, Some(12));
        assert_eq!(env.config_path, Some(PathBuf::from("/etc/storefront.toml")));
        assert!(env.database_url.is_none());
    }

    #[test]
    fn file_config_rejects_unknown_sections() {
        let err = toml::from_str::<FileConfig>("[server]\nport = 3000\n");
        assert!(err.is_err());

        let parsed: FileConfig = toml::from_str("[repair]\nparallelism = 3\n").unwrap();
        assert_eq!(parsed.repair.parallelism, Some(3));
        assert!(parsed.database.url.is_none());
    }
}
