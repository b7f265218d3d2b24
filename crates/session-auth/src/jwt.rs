//! Session token issuance, validation and refresh
//!
//! This module signs [`SessionClaims`] with an RSA private key and verifies
//! incoming tokens with the matching public key, using the jsonwebtoken crate.
//! Expiry and the refresh window are checked here against an explicit clock
//! rather than inside the JWT library, so every time-dependent operation has
//! an `_at` form taking `now`.

use crate::claims::{ClaimsCodec, Identity, SessionClaims};
use crate::error::{AuthError, AuthResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JwtAlgorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
}

impl JwtAlgorithm {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "RS256" => Some(JwtAlgorithm::RS256),
            "RS384" => Some(JwtAlgorithm::RS384),
            "RS512" => Some(JwtAlgorithm::RS512),
            _ => None,
        }
    }
}

impl From<JwtAlgorithm> for Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::RS256 => Algorithm::RS256,
            JwtAlgorithm::RS384 => Algorithm::RS384,
            JwtAlgorithm::RS512 => Algorithm::RS512,
        }
    }
}

/// Key material and lifetimes for the token issuer.
#[derive(Clone)]
pub struct JwtConfig {
    /// Private key (PEM) used for signing
    pub private_key: String,

    /// Public key (PEM) used for verification
    pub public_key: String,

    /// Algorithm to use
    pub algorithm: JwtAlgorithm,

    /// Token lifetime from issuance
    pub timeout: Duration,

    /// How long after issuance a token may still be refreshed
    pub max_refresh: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("private_key", &"[REDACTED]")
            .field("public_key", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("timeout", &self.timeout)
            .field("max_refresh", &self.max_refresh)
            .finish()
    }
}

impl JwtConfig {
    /// Create a configuration with RS256, a 24 hour lifetime and a 90 day
    /// refresh ceiling.
    pub fn new(private_key: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            private_key: private_key.into(),
            public_key: public_key.into(),
            algorithm: JwtAlgorithm::RS256,
            timeout: Duration::hours(24),
            max_refresh: Duration::days(90),
        }
    }
}

/// A freshly signed token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    /// Serialized JWT
    pub token: String,

    /// Absolute expiry
    pub expire: DateTime<Utc>,
}

/// Result of validating an incoming token.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    /// Identity decoded from the claims
    pub identity: Identity,

    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
}

/// Signs, validates and refreshes session tokens.
///
/// Immutable after construction and safe to share between requests.
pub struct TokenIssuer {
    algorithm: JwtAlgorithm,
    timeout: Duration,
    max_refresh: Duration,
    key_id: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("timeout", &self.timeout)
            .field("max_refresh", &self.max_refresh)
            .field("key_id", &self.key_id)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl TokenIssuer {
    /// Create a new issuer from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either key does not parse or the
    /// lifetimes are inconsistent.
    pub fn new(config: JwtConfig) -> AuthResult<Self> {
        if config.timeout <= Duration::zero() {
            return Err(AuthError::Config("token timeout must be positive".to_string()));
        }
        if config.max_refresh < config.timeout {
            return Err(AuthError::Config(
                "max refresh must not be shorter than the token timeout".to_string(),
            ));
        }

        let encoding_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())
            .map_err(|e| AuthError::Config(format!("Invalid RSA private key: {}", e)))?;
        let decoding_key = DecodingKey::from_rsa_pem(config.public_key.as_bytes())
            .map_err(|e| AuthError::Config(format!("Invalid RSA public key: {}", e)))?;
        let key_id = key_fingerprint(&config.public_key);

        tracing::info!(key_id = %key_id, algorithm = ?config.algorithm, "Loaded token signing keys");

        Ok(Self {
            algorithm: config.algorithm,
            timeout: config.timeout,
            max_refresh: config.max_refresh,
            key_id,
            encoding_key,
            decoding_key,
        })
    }

    /// Fingerprint of the public key, sent as the `kid` header.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Token lifetime.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue a token for `identity`.
    pub fn issue(&self, identity: &Identity) -> AuthResult<IssuedToken> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a token for `identity` as of `now`.
    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> AuthResult<IssuedToken> {
        if !identity.is_valid() {
            return Err(AuthError::Internal(format!(
                "refusing to issue a token for user id {}",
                identity.id
            )));
        }

        let claims = SessionClaims::new(identity, now, self.timeout).ok_or_else(|| {
            AuthError::Config(format!("token timeout {} overflows the expiry date", self.timeout))
        })?;
        let mut header = Header::new(self.algorithm.into());
        header.kid = Some(self.key_id.clone());

        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token encoding failed: {}", e)))?;

        tracing::debug!(user_id = identity.id, jti = %claims.jti, "Issued session token");

        Ok(IssuedToken {
            token,
            expire: claims.expires_at(),
        })
    }

    /// Validate a token and decode its identity.
    pub fn validate(&self, token: &str) -> AuthResult<VerifiedToken> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token as of `now`.
    ///
    /// # Errors
    ///
    /// - `TokenSignatureInvalid` if the signature does not verify
    /// - `TokenMalformed` if the token or its `exp` claim is unreadable
    /// - `TokenExpired` if `exp` lies before `now`
    /// - `ClaimsDecode` if the identity claims are absent or mistyped
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<VerifiedToken> {
        let claims = self.verify_signature(token)?;

        let exp = timestamp_claim(&claims, "exp")?;
        if exp < now.timestamp() {
            return Err(AuthError::TokenExpired);
        }

        let identity = ClaimsCodec::decode(&claims)?;
        Ok(VerifiedToken {
            identity,
            expires_at: DateTime::from_timestamp(exp, 0).unwrap_or_default(),
        })
    }

    /// Refresh a token.
    pub fn refresh(&self, token: &str) -> AuthResult<IssuedToken> {
        self.refresh_at(token, Utc::now())
    }

    /// Refresh a token as of `now`.
    ///
    /// The token may be expired but its `orig_iat` must lie within the
    /// refresh window. The new token carries the same identity with new
    /// issuance and expiry times.
    pub fn refresh_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<IssuedToken> {
        let claims = self.verify_signature(token)?;

        let orig_iat = timestamp_claim(&claims, "orig_iat")?;
        let window_start = now.checked_sub_signed(self.max_refresh).ok_or_else(|| {
            AuthError::Config(format!("max refresh {} overflows the refresh window", self.max_refresh))
        })?;
        if orig_iat < window_start.timestamp() {
            return Err(AuthError::TokenExpired);
        }

        let identity = ClaimsCodec::decode(&claims)?;
        self.issue_at(&identity, now)
    }

    fn verify_signature(&self, token: &str) -> AuthResult<Map<String, Value>> {
        let mut validation = Validation::new(self.algorithm.into());
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let token_data: TokenData<Map<String, Value>> =
            decode(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::TokenSignatureInvalid
                }
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenMalformed(e.to_string()),
            })?;

        Ok(token_data.claims)
    }
}

fn timestamp_claim(claims: &Map<String, Value>, name: &str) -> AuthResult<i64> {
    claims
        .get(name)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .ok_or_else(|| AuthError::TokenMalformed(format!("claim `{}` missing or not numeric", name)))
}

fn key_fingerprint(public_key_pem: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(public_key_pem.trim().as_bytes());
    let encoded = base64::Engine::encode(&URL_SAFE_NO_PAD, hasher.finalize());
    encoded[..16].to_string()
}
