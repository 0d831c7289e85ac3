//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CMS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `CMS_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `CMS_API_HOST` - Bind address (default: 127.0.0.1)
//! - `CMS_API_PORT` - Listen port (default: 8080)
//! - `CMS_JWT_ISSUER` - `iss` claim of issued tokens (default: cms)
//! - `CMS_JWT_TTL_SECS` - Token lifetime in seconds (default: 86400)
//! - `CMS_UPLOAD_DIR` - Directory for evidence files (default: uploads)
//! - `CMS_MAX_UPLOAD_BYTES` - Largest accepted upload (default: 10 MiB)
//! - `CMS_CORS_ORIGIN` - Browser origin allowed to call the API
//! - `CMS_RUN_MIGRATIONS` - Apply pending migrations on startup (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate, 0.0 to 1.0 (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
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
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// REST API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token settings
    pub jwt: JwtConfig,
    /// Where uploaded evidence files are stored
    pub upload_dir: PathBuf,
    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
    /// Browser origin allowed by CORS, if any
    pub cors_origin: Option<String>,
    /// Apply pending migrations before serving
    pub run_migrations: bool,
    /// Sentry error tracking settings
    pub sentry: SentryConfig,
}

/// Bearer token settings.
///
/// Implements `Debug` manually to redact the signing secret.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC signing secret
    pub secret: SecretString,
    /// `iss` claim written into and required from every token
    pub issuer: String,
    /// How long an issued token stays valid
    pub ttl: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Sentry settings.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN; Sentry stays disabled when unset
    pub dsn: Option<String>,
    /// Environment tag (e.g. production, staging)
    pub environment: Option<String>,
    /// Error event sample rate
    pub sample_rate: f32,
    /// Performance trace sample rate
    pub traces_sample_rate: f32,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the JWT secret fails validation (length, placeholder, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("CMS_DATABASE_URL")?;
        let host = parse_env("CMS_API_HOST", "127.0.0.1")?;
        let port = parse_env("CMS_API_PORT", "8080")?;

        let secret = get_validated_secret("CMS_JWT_SECRET")?;
        validate_secret_length(&secret, "CMS_JWT_SECRET")?;
        let ttl_secs: u64 = parse_env("CMS_JWT_TTL_SECS", "86400")?;
        if ttl_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CMS_JWT_TTL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let jwt = JwtConfig {
            secret,
            issuer: get_env_or_default("CMS_JWT_ISSUER", "cms"),
            ttl: Duration::from_secs(ttl_secs),
        };

        let upload_dir = PathBuf::from(get_env_or_default("CMS_UPLOAD_DIR", "uploads"));
        let max_upload_bytes = parse_env("CMS_MAX_UPLOAD_BYTES", "10485760")?;
        let cors_origin = get_optional_env("CMS_CORS_ORIGIN");
        let run_migrations = parse_env("CMS_RUN_MIGRATIONS", "false")?;

        Ok(Self {
            database_url,
            host,
            port,
            jwt,
            upload_dir,
            max_upload_bytes,
            cors_origin,
            run_migrations,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_rate("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_rate("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
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

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a sample rate and check it lies in `0.0..=1.0`.
fn parse_rate(key: &str, default: &str) -> Result<f32, ConfigError> {
    let rate: f32 = parse_env(key, default)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("{rate} is outside 0.0..=1.0"),
        ))
    }
}

/// Validate that a secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(**p)) {
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_uniform_and_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("zzzzzz") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("abab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_jwt_secret_rejects_placeholders() {
        for candidate in ["your-jwt-key-goes-here", "CHANGEME-now-please", "my-secret-key"] {
            let err = validate_secret_strength(candidate, "CMS_JWT_SECRET").unwrap_err();
            assert!(matches!(err, ConfigError::InsecureSecret(ref var, _) if var == "CMS_JWT_SECRET"));
        }
    }

    #[test]
    fn test_jwt_secret_rejects_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "CMS_JWT_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_jwt_secret_accepts_random_value() {
        assert!(validate_secret_strength("Qm9#vT2!xL7@pR4$wZ8^kN1&cH6*jB3%", "CMS_JWT_SECRET").is_ok());
    }

    #[test]
    fn test_jwt_secret_length() {
        assert!(validate_secret_length(&SecretString::from("Qm9#vT2!"), "CMS_JWT_SECRET").is_err());
        assert!(validate_secret_length(&SecretString::from("q".repeat(32)), "CMS_JWT_SECRET").is_ok());
    }

    #[test]
    fn test_parse_env_uses_default_and_reports_key() {
        let port: u16 = parse_env("CMS_TEST_UNSET_PORT_VAR", "8080").unwrap();
        assert_eq!(port, 8080);

        let err = parse_env::<u16>("CMS_TEST_UNSET_BAD_VAR", "eighty").unwrap_err();
        assert!(err.to_string().contains("CMS_TEST_UNSET_BAD_VAR"));
    }

    #[test]
    fn test_parse_rate_bounds() {
        assert!((parse_rate("CMS_TEST_UNSET_RATE", "0.25").unwrap() - 0.25).abs() < f32::EPSILON);
        assert!(parse_rate("CMS_TEST_UNSET_RATE", "1.5").is_err());
    }

    #[test]
    fn test_socket_addr_and_debug_redaction() {
        let config = ApiConfig {
            database_url: SecretString::from("postgres://localhost/cms"),
            host: "0.0.0.0".parse().unwrap(),
            port: 8080,
            jwt: JwtConfig {
                secret: SecretString::from("super-private-signing-key-value"),
                issuer: "cms".to_string(),
                ttl: Duration::from_secs(60),
            },
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 1024,
            cors_origin: None,
            run_migrations: false,
            sentry: SentryConfig::default(),
        };

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        let debug = format!("{:?}", config.jwt);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-private-signing-key-value"));
    }
}
