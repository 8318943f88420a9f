//! Grant engine configuration.
//!
//! Controls token lifetimes, token entropy and authorization-code redemption
//! policy.
//!
//! # Example (TOML)
//!
//! ```toml
//! access_token_lifetime = "1h"
//! refresh_token_lifetime = "20m"
//! token_bytes = 32
//! max_redeem_attempts = 1
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Smallest accepted number of random bytes per opaque token (128 bits).
pub const MIN_TOKEN_BYTES: usize = 16;

/// Longest accepted token lifetime (one year).
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Root configuration for the grant engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GrantConfig {
    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime, unless overridden per request.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Number of random bytes in each generated token.
    pub token_bytes: usize,

    /// Maximum number of times an authorization code may be redeemed.
    /// Unset means a code can be redeemed any number of times while unexpired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_redeem_attempts: Option<u32>,

    /// Whether `issue` also mints a refresh token by default.
    pub refresh_required: bool,
}

impl Default for GrantConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime: Duration::from_secs(3600), // 1 hour
            refresh_token_lifetime: Duration::from_secs(20 * 60), // 20 minutes
            token_bytes: 32,
            max_redeem_attempts: None,
            refresh_required: true,
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// The configuration could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("Failed to read configuration file {path}: {message}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error message.
        message: String,
    },
}

impl GrantConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and
    /// `ConfigError::InvalidValue` if validation fails.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise the
    /// errors of [`GrantConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&source)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - Either token lifetime is zero or longer than [`MAX_TOKEN_LIFETIME`]
    /// - `token_bytes` is below [`MIN_TOKEN_BYTES`]
    /// - `max_redeem_attempts` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "access_token_lifetime must be > 0".to_string(),
            ));
        }

        if self.refresh_token_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "refresh_token_lifetime must be > 0".to_string(),
            ));
        }

        for (name, lifetime) in [
            ("access_token_lifetime", self.access_token_lifetime),
            ("refresh_token_lifetime", self.refresh_token_lifetime),
        ] {
            if lifetime > MAX_TOKEN_LIFETIME {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} must be at most {MAX_TOKEN_LIFETIME:?}, got {lifetime:?}"
                )));
            }
        }

        if self.token_bytes < MIN_TOKEN_BYTES {
            return Err(ConfigError::InvalidValue(format!(
                "token_bytes must be at least {}, got {}",
                MIN_TOKEN_BYTES, self.token_bytes
            )));
        }

        if self.max_redeem_attempts == Some(0) {
            return Err(ConfigError::InvalidValue(
                "max_redeem_attempts must be > 0 when set".to_string(),
            ));
        }

        Ok(())
    }
}
