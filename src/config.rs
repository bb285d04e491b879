use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::db::Database;

pub const DATABASE_ENV: &str = "JOBTRACK_DATABASE";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overrides the default data-directory database.
    pub database_path: Option<PathBuf>,
    /// `tracing` filter directive used when RUST_LOG is unset.
    pub log_filter: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find config directory")]
    ConfigDirNotFound,
    #[error("Failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("Failed to write config file {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("Failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load from the default location; a missing file yields defaults.
    /// Without a config directory there is nothing to read, so the env and
    /// data-path fallbacks still apply.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_or_default(config_file_path().ok())
    }

    pub fn load_or_default(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let content = toml::to_string(self)?;
        fs::write(path, content).map_err(write_err)
    }

    /// Env var, then config file, then the platform data directory.
    pub fn database_path(&self) -> PathBuf {
        self.resolve_database_path(std::env::var_os(DATABASE_ENV).map(PathBuf::from))
    }

    fn resolve_database_path(&self, from_env: Option<PathBuf>) -> PathBuf {
        from_env
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| self.database_path.clone())
            .unwrap_or_else(Database::default_path)
    }
}

pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    let dirs = directories::ProjectDirs::from("", "", "jobtrack").ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(dirs.config_dir().join("config.toml"))
}
