pub mod db_url;
pub mod error;

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    models::{
        CONNECTIONS_PER_REPAIR, Config, ConfigMetadata, DEFAULT_MAX_CONNECTIONS,
        DEFAULT_REPAIR_PARALLELISM, DatabaseConfig, MIN_MAX_CONNECTIONS, RepairConfig,
        sources::{EnvConfig, FileConfig},
    },
    validation::ConfigWarnings,
};

use self::{db_url::resolve_database_url, error::ConfigLoadError};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["storefront.toml", "config/storefront.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

/// Result of a successful load: the config plus anything worth telling the
/// operator about.
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
    env: Option<EnvConfig>,
    search_root: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Use these variables instead of the process environment. No `.env`
    /// file is read in this mode.
    pub fn with_env(mut self, env: EnvConfig) -> Self {
        self.env = Some(env);
        self
    }

    /// Directory the default config locations are resolved against.
    /// Defaults to the working directory.
    pub fn with_search_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.search_root = Some(root.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let (env_config, env_file_loaded) = match &self.env {
            Some(env) => (env.clone(), false),
            None => {
                let loaded = self.load_env_file()?;
                (EnvConfig::gather(), loaded)
            }
        };

        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let (config, warnings) =
            compose_config(file_config, &env_config, config_path, env_file_loaded)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        let result = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path),
            None => dotenvy::dotenv().map(|_| ()),
        };
        match result {
            Ok(()) => Ok(true),
            Err(dotenvy::Error::Io(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env_config.config_path.clone());

        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigLoadError::MissingConfig { path });
                }
                path
            }
            None => match self.default_location() {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        debug!(path = %path.display(), "reading configuration file");
        let contents = fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
                path: path.clone(),
                source,
            })?;

        Ok((Some(file_config), Some(path)))
    }

    fn default_location(&self) -> Option<PathBuf> {
        let root = self.search_root.as_deref().unwrap_or(Path::new(""));
        DEFAULT_CONFIG_LOCATIONS
            .iter()
            .map(|candidate| root.join(candidate))
            .find(|candidate| candidate.is_file())
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: &EnvConfig,
    config_path: Option<PathBuf>,
    env_file_loaded: bool,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if file_config.is_none() {
        warnings.push_with_hint(
            "No storefront.toml detected; using environment variables and defaults",
            "Pass --config or set STOREFRONT_CONFIG to point at a configuration file",
        );
    }

    let FileConfig {
        database: file_database,
        repair: file_repair,
    } = file_config.unwrap_or_default();

    let url = match resolve_database_url(env, &file_database)? {
        Some((url, source)) => {
            debug!(?source, "resolved database url");
            Some(url)
        }
        None => {
            warnings.push_with_hint(
                "No database URL configured",
                "Set DATABASE_URL or database.url before running database commands",
            );
            None
        }
    };

    let mut max_connections = env
        .database_max_connections
        .or(file_database.max_connections)
        .unwrap_or(DEFAULT_MAX_CONNECTIONS);
    if max_connections < MIN_MAX_CONNECTIONS {
        warnings.push(format!(
            "database.max_connections must be at least {MIN_MAX_CONNECTIONS}; \
             using {MIN_MAX_CONNECTIONS}"
        ));
        max_connections = MIN_MAX_CONNECTIONS;
    }

    let mut parallelism = env
        .repair_parallelism
        .or(file_repair.parallelism)
        .unwrap_or(DEFAULT_REPAIR_PARALLELISM);
    if parallelism == 0 {
        warnings.push("repair.parallelism must be at least 1; using 1");
        parallelism = 1;
    }
    let needed = parallelism.saturating_mul(CONNECTIONS_PER_REPAIR);
    if needed > max_connections as usize {
        warnings.push_with_hint(
            format!(
                "repair.parallelism ({parallelism}) needs {needed} connections; \
                 database.max_connections is {max_connections}"
            ),
            "Each repair holds a lock connection and a query connection; \
             storefrontctl lowers parallelism to fit the pool",
        );
    }

    let config = Config {
        database: DatabaseConfig {
            url,
            max_connections,
        },
        repair: RepairConfig { parallelism },
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded,
        },
    };
    Ok((config, warnings))
}
