//! Configuration for the `weft` binary.
//!
//! # Layering
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌─────────────────────────────────────────┐
//! │  1. CLI flags (--debug, --no-cache)     │  Per-run override
//! ├─────────────────────────────────────────┤
//! │  2. Environment Variables (WEFT_*)      │  Runtime override
//! ├─────────────────────────────────────────┤
//! │  3. Config file (--config / weft.toml)  │  Advice definitions
//! ├─────────────────────────────────────────┤
//! │  4. Default Values (compile-time)       │  Fallback
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `WEFT_CACHE_RESOLUTIONS` | `dispatch.cache_resolutions` | bool |
//! | `WEFT_LOG_LEVEL` | `logging.level` | level name |
//!
//! # Example Configuration
//!
//! ```toml
//! [dispatch]
//! cache_resolutions = true
//!
//! [logging]
//! level = "warn"
//!
//! [[pointcuts]]
//! name = "forDaoPackage"
//! expr = "execution(* demo.dao.*.*(..))"
//!
//! [[advices]]
//! id = "log-dao-calls"
//! kind = "before"
//! pointcut = "forDaoPackage"
//! handler = "log-call"
//! ```

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_CONFIG_FILE};

use serde::{Deserialize, Serialize};
use weft_advice::{AdvicesConfig, DispatchConfig};

/// Level names accepted by `logging.level` and `WEFT_LOG_LEVEL`.
pub const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeftConfig {
    /// Dispatcher settings.
    pub dispatch: DispatchConfig,
    /// Terminal logging.
    pub logging: LoggingConfig,
    /// Pointcuts and advice bindings.
    #[serde(flatten)]
    pub advice: AdvicesConfig,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when neither a flag nor `RUST_LOG` is given.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl WeftConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the document is malformed.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Checks values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unknown log level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_log_level(&self.logging.level) {
            return Err(ConfigError::invalid(
                "logging.level",
                format!(
                    "unknown level '{}' (expected one of {})",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }
        Ok(())
    }
}

/// Returns `true` for a known level name, case-insensitively.
pub fn is_log_level(level: &str) -> bool {
    LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
}
