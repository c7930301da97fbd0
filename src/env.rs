use std::path::Path;

use anyhow::Context;
use thiserror::Error;
use tracing::{info, warn};

pub const HOST_VAR: &str = "DB_HOST";
pub const PORT_VAR: &str = "DB_PORT";
pub const USER_VAR: &str = "DB_USER";
pub const PASSWORD_VAR: &str = "DB_PASSWORD";
pub const DATABASE_VAR: &str = "DB_NAME";
pub const MAX_CONNECTIONS_VAR: &str = "DB_MAX_CONNECTIONS";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Environment variable {0} not found")]
    Missing(&'static str),

    #[error("Environment variable {name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Env files read at startup. Kept so they can be logged once tracing is up.
#[derive(Debug, Default, PartialEq)]
pub struct LoadedEnvironment {
    pub loaded: Vec<String>,
    pub skipped: Vec<String>,
}

impl LoadedEnvironment {
    pub fn log(&self) {
        for path in &self.skipped {
            warn!("Environment file {} not found, skipping", path);
        }
        for path in &self.loaded {
            info!("Loaded environment from: {}", path);
        }
    }
}

pub fn load_environment() -> anyhow::Result<LoadedEnvironment> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        ["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        ["config/common.env", "config/dev.env", ".secrets.env"]
    };

    load_env_files(&env_files)
}

fn load_env_files(paths: &[&str]) -> anyhow::Result<LoadedEnvironment> {
    let mut environment = LoadedEnvironment::default();

    for path in paths {
        if !Path::new(path).exists() {
            environment.skipped.push(path.to_string());
            continue;
        }

        dotenvy::from_filename_override(path)
            .with_context(|| format!("Failed to load environment file {}", path))?;
        environment.loaded.push(path.to_string());
    }

    Ok(environment)
}

/// Connection settings for the timing database. All five values are required.
#[derive(Clone, PartialEq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl DbConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port_raw = require(PORT_VAR)?;
        let port = port_raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
            name: PORT_VAR,
            value: port_raw.clone(),
        })?;

        let max_connections = match dotenvy::var(MAX_CONNECTIONS_VAR) {
            Ok(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|count| *count > 0)
                .ok_or(ConfigError::Invalid {
                    name: MAX_CONNECTIONS_VAR,
                    value: raw,
                })?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            host: require(HOST_VAR)?,
            port,
            user: require(USER_VAR)?,
            password: require(PASSWORD_VAR)?,
            database: require(DATABASE_VAR)?,
            max_connections,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    match dotenvy::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}
