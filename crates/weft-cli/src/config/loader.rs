//! Configuration loader with layered overrides.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Config file (`--config <path>`, else `./weft.toml` if present)
//! 3. Environment variables (`WEFT_*`)
//!
//! Each layer overrides the previous. CLI flags are applied by the binary
//! on top of the loaded config.

use super::{is_log_level, ConfigError, WeftConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "weft.toml";

/// Helper macro for parsing boolean environment variables.
macro_rules! parse_env_bool {
    ($lookup:expr, $field:expr, $var:literal) => {
        if let Some(val) = $lookup($var) {
            $field = parse_bool(&val)
                .ok_or_else(|| ConfigError::invalid_env_var($var, "expected bool"))?;
        }
    };
}

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```ignore
/// let config = ConfigLoader::new()
///     .with_config_path("aspects/logging.toml")
///     .skip_env_vars()  // For testing
///     .load()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Explicit config file. Must exist when set.
    config_path: Option<PathBuf>,

    /// Directory searched for [`DEFAULT_CONFIG_FILE`] (defaults to `.`).
    working_dir: Option<PathBuf>,

    /// Skip environment variable loading.
    skip_env: bool,
}

impl ConfigLoader {
    /// Creates a new loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an explicit config file instead of `./weft.toml`.
    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Sets the directory searched for the default config file.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Skips environment variable loading.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Loads and merges configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit config file is missing, any
    /// config file cannot be parsed, or an environment variable is malformed.
    pub fn load(&self) -> Result<WeftConfig, ConfigError> {
        self.load_with(|name| std::env::var(name).ok())
    }

    /// Like [`load`](Self::load), reading environment variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn load_with<F>(&self, lookup: F) -> Result<WeftConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Layer 1: file
        let mut config = match &self.config_path {
            Some(path) => {
                let config = read_config(path)?;
                debug!(path = %path.display(), "Loaded config");
                config
            }
            None => {
                let path = self
                    .working_dir
                    .as_deref()
                    .unwrap_or_else(|| Path::new("."))
                    .join(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    let config = read_config(&path)?;
                    debug!(path = %path.display(), "Loaded default config");
                    config
                } else {
                    debug!(path = %path.display(), "No config file, using defaults");
                    WeftConfig::default()
                }
            }
        };

        // Layer 2: environment
        if !self.skip_env {
            apply_env_vars(&mut config, &lookup)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn read_config(path: &Path) -> Result<WeftConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    WeftConfig::from_toml(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Applies environment variable overrides.
fn apply_env_vars<F>(config: &mut WeftConfig, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_env_bool!(
        lookup,
        config.dispatch.cache_resolutions,
        "WEFT_CACHE_RESOLUTIONS"
    );

    if let Some(val) = lookup("WEFT_LOG_LEVEL") {
        if !is_log_level(&val) {
            return Err(ConfigError::invalid_env_var(
                "WEFT_LOG_LEVEL",
                format!("unknown level '{val}'"),
            ));
        }
        config.logging.level = val.to_ascii_lowercase();
    }

    Ok(())
}

/// Parses a boolean string.
///
/// Accepts: "true", "false", "1", "0", "yes", "no", "on", "off"
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
