//! Gateway configuration.
//!
//! Loaded from environment variables with defaults matching the historical
//! deployment: RS256, 24 hour tokens, 90 day refresh ceiling, token looked up
//! in the Authorization header, then the `token` query parameter, then the
//! `jwt` cookie.

use crate::error::{AuthError, AuthResult};
use crate::jwt::{JwtAlgorithm, JwtConfig};
use crate::lookup::{TokenLookup, DEFAULT_TOKEN_HEAD_NAME, DEFAULT_TOKEN_LOOKUP};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upper bound for any configured lifetime, ten years.
pub const MAX_LIFETIME_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Realm name reported to clients.
    pub realm: String,

    /// Signing algorithm.
    pub algorithm: JwtAlgorithm,

    /// Path of the PEM public key.
    pub public_key_file: Option<PathBuf>,

    /// Path of the PEM private key.
    pub private_key_file: Option<PathBuf>,

    /// Token lifetime in seconds.
    pub timeout_secs: i64,

    /// Refresh ceiling in seconds, measured from a token's issuance.
    pub max_refresh_secs: i64,

    /// Token lookup, e.g. `"header: Authorization, query: token, cookie: jwt"`.
    pub token_lookup: String,

    /// Scheme expected before the token in the header.
    pub token_head_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            realm: "Jwt".to_string(),
            algorithm: JwtAlgorithm::RS256,
            public_key_file: None,
            private_key_file: None,
            timeout_secs: 24 * 60 * 60,
            max_refresh_secs: 90 * 24 * 60 * 60,
            token_lookup: DEFAULT_TOKEN_LOOKUP.to_string(),
            token_head_name: DEFAULT_TOKEN_HEAD_NAME.to_string(),
        }
    }
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `JWT_REALM`: realm name (default: Jwt)
    /// - `JWT_ALGORITHM`: RS256, RS384 or RS512 (default: RS256)
    /// - `JWT_PUBLIC_KEY_FILE`: PEM public key path
    /// - `JWT_PRIVATE_KEY_FILE`: PEM private key path
    /// - `JWT_TIMEOUT_SECS`: token lifetime (default: 86400)
    /// - `JWT_MAX_REFRESH_SECS`: refresh ceiling (default: 7776000)
    /// - `JWT_TOKEN_LOOKUP`: token lookup order
    /// - `JWT_TOKEN_HEAD_NAME`: header scheme (default: Bearer)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            realm: std::env::var("JWT_REALM").unwrap_or(default.realm),
            algorithm: std::env::var("JWT_ALGORITHM")
                .ok()
                .and_then(|s| JwtAlgorithm::parse(&s))
                .unwrap_or(default.algorithm),
            public_key_file: std::env::var("JWT_PUBLIC_KEY_FILE").ok().map(PathBuf::from),
            private_key_file: std::env::var("JWT_PRIVATE_KEY_FILE").ok().map(PathBuf::from),
            timeout_secs: std::env::var("JWT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.timeout_secs),
            max_refresh_secs: std::env::var("JWT_MAX_REFRESH_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_refresh_secs),
            token_lookup: std::env::var("JWT_TOKEN_LOOKUP").unwrap_or(default.token_lookup),
            token_head_name: std::env::var("JWT_TOKEN_HEAD_NAME").unwrap_or(default.token_head_name),
        }
    }

    /// Token lifetime as a Duration.
    pub fn timeout(&self) -> AuthResult<Duration> {
        lifetime("JWT_TIMEOUT_SECS", self.timeout_secs)
    }

    /// Refresh ceiling as a Duration.
    pub fn max_refresh(&self) -> AuthResult<Duration> {
        lifetime("JWT_MAX_REFRESH_SECS", self.max_refresh_secs)
    }

    /// Parsed token lookup.
    pub fn token_lookup(&self) -> AuthResult<TokenLookup> {
        TokenLookup::parse(&self.token_lookup, self.token_head_name.clone())
    }

    /// Validate that the configuration can start a gateway.
    pub fn validate(&self) -> AuthResult<()> {
        if self.public_key_file.is_none() {
            return Err(AuthError::Config(
                "Missing required environment variable: JWT_PUBLIC_KEY_FILE".to_string(),
            ));
        }
        if self.private_key_file.is_none() {
            return Err(AuthError::Config(
                "Missing required environment variable: JWT_PRIVATE_KEY_FILE".to_string(),
            ));
        }
        let timeout = self.timeout()?;
        if self.max_refresh()? < timeout {
            return Err(AuthError::Config(
                "JWT_MAX_REFRESH_SECS must not be shorter than JWT_TIMEOUT_SECS".to_string(),
            ));
        }
        if self.token_head_name.trim().is_empty() || self.token_head_name.contains(' ') {
            return Err(AuthError::Config("JWT_TOKEN_HEAD_NAME must be a single word".to_string()));
        }
        self.token_lookup()?;
        Ok(())
    }

    /// Read the key files and build the issuer configuration.
    pub fn jwt_config(&self) -> AuthResult<JwtConfig> {
        self.validate()?;

        let private_key = read_key(self.private_key_file.as_ref())?;
        let public_key = read_key(self.public_key_file.as_ref())?;

        Ok(JwtConfig {
            private_key,
            public_key,
            algorithm: self.algorithm,
            timeout: self.timeout()?,
            max_refresh: self.max_refresh()?,
        })
    }
}

fn lifetime(name: &str, secs: i64) -> AuthResult<Duration> {
    if secs <= 0 || secs > MAX_LIFETIME_SECS {
        return Err(AuthError::Config(format!(
            "{} must be between 1 and {} seconds",
            name, MAX_LIFETIME_SECS
        )));
    }
    Duration::try_seconds(secs)
        .ok_or_else(|| AuthError::Config(format!("{} is out of range", name)))
}

fn read_key(path: Option<&PathBuf>) -> AuthResult<String> {
    let path = path.ok_or_else(|| AuthError::Config("key file not configured".to_string()))?;
    std::fs::read_to_string(path)
        .map_err(|e| AuthError::Config(format!("cannot read key file {}: {}", path.display(), e)))
}
