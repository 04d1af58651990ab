//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `COMPTOIR_BASE_URL` - Public URL for the storefront
//! - `COMPTOIR_API_URL` - Base URL of the commerce REST backend
//!
//! ## Optional
//! - `COMPTOIR_HOST` - Bind address (default: 127.0.0.1)
//! - `COMPTOIR_PORT` - Listen port (default: 3000)
//! - `COMPTOIR_API_KEY` - Client key sent to the backend as `X-Api-Key` (high entropy)
//! - `COMPTOIR_API_TIMEOUT_SECS` - Backend request timeout (default: 10)
//! - `COMPTOIR_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `COMPTOIR_SESSION_EXPIRY_HOURS` - Session inactivity expiry (default: 168)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "motdepasse",
    "xxx",
    "todo",
    "a-remplacer",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Commerce backend configuration
    pub backend: BackendConfig,
    /// Session inactivity expiry, in hours
    pub session_expiry_hours: i64,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
}

/// Commerce backend configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL of the REST backend (e.g. `https://api.comptoir-pro.fr/api`)
    pub api_url: Url,
    /// Optional client key sent with every request
    pub api_key: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Lifetime of cached catalog responses
    pub catalog_cache_ttl: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("catalog_cache_ttl", &self.catalog_cache_ttl)
            .finish()
    }
}

impl BackendConfig {
    /// Backend configuration with default timeouts and no API key.
    #[must_use]
    pub const fn new(api_url: Url) -> Self {
        Self {
            api_url,
            api_key: None,
            timeout: Duration::from_secs(10),
            catalog_cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Sentry configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("COMPTOIR_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("COMPTOIR_PORT", "3000")?;
        let base_url = get_required_env("COMPTOIR_BASE_URL")?;
        let session_expiry_hours = parse_env_or_default::<i64>("COMPTOIR_SESSION_EXPIRY_HOURS", "168")?;

        Ok(Self {
            host,
            port,
            base_url,
            backend: BackendConfig::from_env()?,
            session_expiry_hours,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("COMPTOIR_API_URL")?;
        let api_url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("COMPTOIR_API_URL".to_string(), e.to_string())
        })?;

        let api_key = match get_optional_env("COMPTOIR_API_KEY") {
            Some(value) => {
                validate_secret_strength(&value, "COMPTOIR_API_KEY")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        let timeout_secs = parse_env_or_default::<u64>("COMPTOIR_API_TIMEOUT_SECS", "10")?;
        let ttl_secs = parse_env_or_default::<u64>("COMPTOIR_CATALOG_CACHE_TTL_SECS", "300")?;

        Ok(Self {
            api_url,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
            catalog_cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or_default::<f32>("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env_or_default::<f32>("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to a default value.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_edges() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_rejects_placeholders() {
        for value in ["your-api-key", "changeme123", "cle-a-remplacer"] {
            let err = validate_secret_strength(value, "COMPTOIR_API_KEY").unwrap_err();
            assert!(matches!(err, ConfigError::InsecureSecret(_, _)), "{value}");
        }
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("abababababababababab", "COMPTOIR_API_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("k9$Qz2!vLm7@Wp4#Tr8&Yc1", "COMPTOIR_API_KEY").is_ok());
    }

    #[test]
    fn test_socket_addr_and_secure_flag() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://www.comptoir-pro.fr".to_string(),
            backend: BackendConfig::new(Url::parse("http://localhost:8080/api").unwrap()),
            session_expiry_hours: 168,
            sentry: SentryConfig::default(),
        };

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert!(config.is_secure());
    }

    #[test]
    fn test_backend_config_debug_redacts_api_key() {
        let mut backend = BackendConfig::new(Url::parse("http://localhost:8080/api").unwrap());
        backend.api_key = Some(SecretString::from("k9$Qz2!vLm7@Wp4#Tr8&Yc1"));

        let debug_output = format!("{backend:?}");
        assert!(debug_output.contains("localhost:8080"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("k9$Qz2"));
    }
}
