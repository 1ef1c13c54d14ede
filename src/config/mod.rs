use crate::utils::DEFAULT_DATABASE;
use crate::version::{binary_version, Version, VersionError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Version error: {0}")]
    VersionError(#[from] VersionError),
}

fn default_database() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE)
}

/// Installer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallerConfig {
    /// SQLite database file to install into.
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// Directory of installation scripts. The compiled-in scripts are used
    /// when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts_dir: Option<PathBuf>,
    /// Version of the running application. Defaults to the installer's own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_version: Option<String>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            scripts_dir: None,
            binary_version: None,
        }
    }
}

/// Values given on the command line or in the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database: Option<PathBuf>,
    pub scripts_dir: Option<PathBuf>,
    pub binary_version: Option<String>,
}

impl InstallerConfig {
    /// Apply overrides on top of this configuration
    pub fn merge(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(database) = overrides.database {
            self.database = database;
        }
        if overrides.scripts_dir.is_some() {
            self.scripts_dir = overrides.scripts_dir;
        }
        if overrides.binary_version.is_some() {
            self.binary_version = overrides.binary_version;
        }
        self
    }

    /// The configured binary version, or the installer's own
    pub fn binary_version(&self) -> Result<Version, ConfigError> {
        match &self.binary_version {
            Some(v) => Ok(Version::parse(v)?),
            None => Ok(binary_version()),
        }
    }
}

/// Read the configuration file
pub fn read_config(config_path: &Path) -> Result<Option<InstallerConfig>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(config_path)?;
    let config: InstallerConfig = serde_json::from_str(&content)?;
    Ok(Some(config))
}

/// Write the configuration file
pub fn write_config(config_path: &Path, config: &InstallerConfig) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(config_path, content)?;
    Ok(())
}

/// Read the configuration file, if any, and apply overrides
pub fn resolve(
    config_path: &Path,
    overrides: ConfigOverrides,
) -> Result<InstallerConfig, ConfigError> {
    let config = read_config(config_path)?.unwrap_or_default();
    Ok(config.merge(overrides))
}
