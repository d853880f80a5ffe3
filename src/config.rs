//! Configuration types.

use crate::error::ConfigError;
use crate::onboarding::engine::DEFAULT_WRITE_RETRIES;

/// Service configuration, read from `HR_ONBOARDING_*` environment
/// variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the libSQL database file.
    pub db_path: String,
    /// HTTP bind port.
    pub port: u16,
    /// Compare-and-swap retry budget for record writes.
    pub write_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "./data/onboarding.db".to_string(),
            port: 8080,
            write_retries: DEFAULT_WRITE_RETRIES,
        }
    }
}

/// Parse an optional environment value. Unset falls back to the default;
/// a value that is present but unparsable is a configuration error, not
/// something to silently ignore.
fn parse_value<T: std::str::FromStr>(
    key: &str,
    value: Option<&str>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse {v:?}"),
        }),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from the environment. Unset variables fall back
    /// to defaults; a set-but-invalid variable fails loudly.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            db_path: std::env::var("HR_ONBOARDING_DB_PATH").unwrap_or(defaults.db_path),
            port: parse_value(
                "HR_ONBOARDING_PORT",
                std::env::var("HR_ONBOARDING_PORT").ok().as_deref(),
                defaults.port,
            )?,
            write_retries: parse_value(
                "HR_ONBOARDING_WRITE_RETRIES",
                std::env::var("HR_ONBOARDING_WRITE_RETRIES").ok().as_deref(),
                defaults.write_retries,
            )?,
        })
    }
}
