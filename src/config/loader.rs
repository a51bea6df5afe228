//! Configuration file loader.

use std::path::{Path, PathBuf};

use super::types::KioskConfig;

/// Errors from configuration loading.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Returns the default configuration path.
///
/// This is `~/.config/campus-kiosk/config.toml` on Unix systems.
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("campus-kiosk")
        .join("config.toml")
}

/// Load configuration from an explicit path, or from the default location.
///
/// A missing file at the default location yields the built-in defaults; an
/// explicitly given path must exist.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<KioskConfig, ConfigError> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (default_config_path(), false),
    };

    if !required && !path.exists() {
        tracing::debug!(path = %path.display(), "No config file found, using defaults");
        return Ok(KioskConfig::default());
    }

    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}
