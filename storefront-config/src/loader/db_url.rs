use std::{fs::read_to_string, path::Path};

use url::Url;

use crate::{
    loader::error::ConfigLoadError,
    models::sources::{EnvConfig, FileDatabaseConfig},
};

/// Where the effective PostgreSQL URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseUrlSource {
    /// `DATABASE_URL`
    Env,
    /// `DATABASE_URL_FILE`
    EnvFile,
    /// `database.url` in the TOML file
    File,
    /// Assembled from `DATABASE_HOST` / `DATABASE_USER` / `DATABASE_NAME`.
    Components,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.clone().filter(|value| !value.trim().is_empty())
}

pub fn resolve_database_url(
    env: &EnvConfig,
    file_database: &FileDatabaseConfig,
) -> Result<Option<(String, DatabaseUrlSource)>, ConfigLoadError> {
    if let Some(url) = non_blank(&env.database_url) {
        return Ok(Some((url, DatabaseUrlSource::Env)));
    }

    if let Some(path) = env.database_url_file.as_ref()
        && let Some(url) = read_secret_file(path)?
    {
        return Ok(Some((url, DatabaseUrlSource::EnvFile)));
    }

    if let Some(ref stored_url) = file_database.url {
        let trimmed = stored_url.trim();
        if !trimmed.is_empty() {
            let mut parsed = Url::parse(trimmed)
                .map_err(|source| ConfigLoadError::InvalidDatabaseUrl { source })?;
            if parsed.password().is_none()
                && let Some(password) = resolve_database_password(env, file_database)?
            {
                parsed
                    .set_password(Some(&password))
                    .map_err(|_| ConfigLoadError::InvalidDatabasePassword)?;
            }
            return Ok(Some((parsed.to_string(), DatabaseUrlSource::File)));
        }
    }

    let host = non_blank(&env.database_host);
    let user = non_blank(&env.database_user);
    let name = non_blank(&env.database_name);

    if let (Some(host), Some(user), Some(name)) = (host, user, name) {
        let port = env.database_port.unwrap_or(5432);
        let mut url = Url::parse(&format!("postgresql://{host}:{port}/{name}"))
            .map_err(|source| ConfigLoadError::InvalidDatabaseUrl { source })?;
        url.set_username(&user)
            .map_err(|_| ConfigLoadError::InvalidDatabaseUsername {
                username: user.clone(),
            })?;
        if let Some(password) = resolve_database_password(env, file_database)? {
            url.set_password(Some(&password))
                .map_err(|_| ConfigLoadError::InvalidDatabasePassword)?;
        }
        return Ok(Some((url.to_string(), DatabaseUrlSource::Components)));
    }

    Ok(None)
}

pub fn resolve_database_password(
    env: &EnvConfig,
    file_database: &FileDatabaseConfig,
) -> Result<Option<String>, ConfigLoadError> {
    if let Some(password) = non_blank(&env.database_password) {
        return Ok(Some(password));
    }

    for path in [
        env.database_password_file.as_ref(),
        file_database.password_file.as_ref(),
    ]
    .into_iter()
    .flatten()
    {
        if let Some(secret) = read_secret_file(path)? {
            return Ok(Some(secret));
        }
    }

    Ok(None)
}

/// Read a secret, trimming surrounding whitespace. Empty files count as unset.
pub fn read_secret_file(path: &Path) -> Result<Option<String>, ConfigLoadError> {
    let contents = read_to_string(path).map_err(|source| ConfigLoadError::SecretFileIo {
        path: path.to_path_buf(),
        source,
    })?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}
