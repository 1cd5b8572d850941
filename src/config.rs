// Configuration management

use crate::core::constants::crypto::{KEY_LENGTH, SALT_LENGTH};
use crate::core::errors::InvitationError;
use secrecy::{ExposeSecret, Secret};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Where the two stores keep their records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process maps; records vanish with the process
    Memory,
    /// Redis hashes, one per namespace, values encrypted at rest
    Redis,
}

impl FromStr for StoreBackend {
    type Err = InvitationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(InvitationError::ConfigurationError(format!(
                "Invalid STORE_BACKEND '{}': must be 'memory' or 'redis'",
                other
            ))),
        }
    }
}

/// Application configuration loaded from environment variables
///
/// Secrets are wrapped in `secrecy::Secret` and never appear in `Debug`
/// output. All values are validated on load.
#[derive(Clone)]
pub struct Config {
    pub store_backend: StoreBackend,

    // Redis configuration
    pub redis_url: String,
    pub redis_connection_timeout_secs: u64,
    pub security_codes_namespace: String,
    pub access_invitations_namespace: String,

    // Encryption at rest (required for the Redis backend)
    pub encryption_key: Option<Secret<String>>,
    pub encryption_salt: Option<Secret<String>>,
    pub hash_store_keys: bool,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_env() -> Result<Self, InvitationError> {
        // Skip in test environment to avoid interfering with test environment variables
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok();
        }

        let config = Self {
            store_backend: Self::get_env_or_default("STORE_BACKEND", "memory").parse()?,
            redis_url: Self::get_env_or_default("REDIS_URL", "redis://localhost:6379/0"),
            redis_connection_timeout_secs: Self::parse_u64_or_default("REDIS_CONNECTION_TIMEOUT_SECS", 5)?,
            security_codes_namespace: Self::get_env_or_default("SECURITY_CODES_NAMESPACE", "security-codes"),
            access_invitations_namespace: Self::get_env_or_default(
                "ACCESS_INVITATIONS_NAMESPACE",
                "access-invitations",
            ),
            encryption_key: Self::get_optional_env("ENCRYPTION_KEY").map(Secret::new),
            encryption_salt: Self::get_optional_env("ENCRYPTION_SALT").map(Secret::new),
            hash_store_keys: Self::parse_bool_or_default("HASH_STORE_KEYS", true)?,
            log_level: Self::get_env_or_default("LOG_LEVEL", "info"),
            log_format: Self::get_env_or_default("LOG_FORMAT", "text"),
        };

        config.validate()?;

        Ok(config)
    }

    /// Get environment variable or return default value
    fn get_env_or_default(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get optional environment variable (empty counts as unset)
    fn get_optional_env(key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    /// Parse u64 from environment variable or return default
    fn parse_u64_or_default(key: &str, default: u64) -> Result<u64, InvitationError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<u64>().map_err(|e| {
                    InvitationError::ConfigurationError(format!("Invalid {} value '{}': {}", key, value, e))
                })?;

                if parsed == 0 {
                    return Err(InvitationError::ConfigurationError(format!(
                        "{} must be greater than 0",
                        key
                    )));
                }

                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    /// Parse a boolean flag ("true"/"false"/"1"/"0") or return default
    fn parse_bool_or_default(key: &str, default: bool) -> Result<bool, InvitationError> {
        match env::var(key) {
            Ok(value) => match value.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(InvitationError::ConfigurationError(format!(
                    "Invalid {} value '{}': expected true or false",
                    key, value
                ))),
            },
            _ => Ok(default),
        }
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), InvitationError> {
        if self.store_backend == StoreBackend::Redis {
            Self::validate_url(&self.redis_url, "Redis URL")?;
            Self::validate_secret_length(self.encryption_key.as_ref(), "ENCRYPTION_KEY", KEY_LENGTH)?;
            Self::validate_secret_length(self.encryption_salt.as_ref(), "ENCRYPTION_SALT", SALT_LENGTH)?;

            if self.security_codes_namespace == self.access_invitations_namespace {
                return Err(InvitationError::ConfigurationError(
                    "SECURITY_CODES_NAMESPACE and ACCESS_INVITATIONS_NAMESPACE must differ".to_string(),
                ));
            }
        }

        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    /// Secret must be present and exactly `expected` bytes long
    fn validate_secret_length(
        secret: Option<&Secret<String>>,
        name: &str,
        expected: usize,
    ) -> Result<(), InvitationError> {
        let secret = secret.ok_or_else(|| {
            InvitationError::ConfigurationError(format!("{} is required for the redis backend", name))
        })?;

        let actual = secret.expose_secret().len();
        if actual != expected {
            return Err(InvitationError::ConfigurationError(format!(
                "{} must be exactly {} bytes, got {}",
                name, expected, actual
            )));
        }
        Ok(())
    }

    /// Validate URL format
    fn validate_url(url: &str, description: &str) -> Result<(), InvitationError> {
        url::Url::parse(url).map_err(|e| {
            InvitationError::ConfigurationError(format!("Invalid {} '{}': {}", description, url, e))
        })?;
        Ok(())
    }

    /// Validate log level
    fn validate_log_level(level: &str) -> Result<(), InvitationError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(InvitationError::ConfigurationError(format!(
                "Invalid LOG_LEVEL '{}': must be one of {}",
                level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    /// Validate log format
    fn validate_log_format(format: &str) -> Result<(), InvitationError> {
        if format != "json" && format != "text" {
            return Err(InvitationError::ConfigurationError(format!(
                "Invalid LOG_FORMAT '{}': must be 'json' or 'text'",
                format
            )));
        }
        Ok(())
    }

    /// In-memory configuration for tests, bypassing the environment
    pub fn test_config() -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            redis_url: "redis://localhost:6379/0".to_string(),
            redis_connection_timeout_secs: 2,
            security_codes_namespace: "security-codes".to_string(),
            access_invitations_namespace: "access-invitations".to_string(),
            encryption_key: Some(Secret::new("16-DigitsCipherK".to_string())),
            encryption_salt: Some(Secret::new("Randomly_Ganareted_32-DigitsSalt".to_string())),
            hash_store_keys: true,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |secret: &Option<Secret<String>>| secret.as_ref().map(|_| "<REDACTED>");
        f.debug_struct("Config")
            .field("store_backend", &self.store_backend)
            .field("redis_url", &self.redis_url)
            .field("redis_connection_timeout_secs", &self.redis_connection_timeout_secs)
            .field("security_codes_namespace", &self.security_codes_namespace)
            .field("access_invitations_namespace", &self.access_invitations_namespace)
            .field("encryption_key", &redacted(&self.encryption_key))
            .field("encryption_salt", &redacted(&self.encryption_salt))
            .field("hash_store_keys", &self.hash_store_keys)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}
