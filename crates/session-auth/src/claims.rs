//! Session token claims
//!
//! This module maps an authenticated [`Identity`] to the claim set carried by
//! a session token and back. The user id and display name are written twice,
//! as `id`/`name` and `uid`/`uname`, because two generations of consumers read
//! different keys.

use crate::error::ClaimsError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// An authenticated user.
///
/// Produced by a credential verifier, consumed by [`ClaimsCodec`], and attached
/// to protected requests after token validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// User id in the backing store (always >= 1 for a real user)
    pub id: i64,

    /// Display name
    pub display_name: String,
}

impl Identity {
    /// Create a new identity.
    pub fn new(id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }

    /// Whether this identity refers to a real user.
    ///
    /// Collaborators may hand back a zero-value identity without an error;
    /// such an identity is never authenticated.
    pub fn is_valid(&self) -> bool {
        self.id >= 1
    }
}

/// Identity claims, under both historical key names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// User id
    pub id: i64,

    /// Display name
    pub name: String,

    /// User id (legacy key)
    pub uid: i64,

    /// Display name (legacy key)
    pub uname: String,
}

/// Full claim set of a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity claims
    #[serde(flatten)]
    pub identity: IdentityClaims,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Start of the refresh window (Unix timestamp)
    pub orig_iat: i64,

    /// Token id
    pub jti: String,
}

impl SessionClaims {
    /// Build claims for `identity` issued at `now` and valid for `ttl`.
    ///
    /// Returns `None` if the expiry falls outside the representable date range.
    pub fn new(identity: &Identity, now: DateTime<Utc>, ttl: Duration) -> Option<Self> {
        let expires = now.checked_add_signed(ttl)?;
        Some(Self {
            identity: ClaimsCodec::encode(identity),
            exp: expires.timestamp(),
            iat: now.timestamp(),
            orig_iat: now.timestamp(),
            jti: Uuid::now_v7().to_string(),
        })
    }

    /// Get expiration as DateTime.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

/// Encoder/decoder between [`Identity`] and token claims.
pub struct ClaimsCodec;

impl ClaimsCodec {
    /// Encode an identity into its claims.
    pub fn encode(identity: &Identity) -> IdentityClaims {
        IdentityClaims {
            id: identity.id,
            name: identity.display_name.clone(),
            uid: identity.id,
            uname: identity.display_name.clone(),
        }
    }

    /// Decode an identity from a verified claim map.
    ///
    /// Reads `id` (number) and `name` (string). Integral floats are accepted
    /// for `id` since some issuers emit every JSON number as a double.
    pub fn decode(claims: &Map<String, Value>) -> Result<Identity, ClaimsError> {
        let id = match claims.get("id") {
            None | Some(Value::Null) => return Err(ClaimsError::Missing("id")),
            Some(Value::Number(n)) => number_to_id(n)?,
            Some(_) => {
                return Err(ClaimsError::WrongType {
                    claim: "id",
                    expected: "number",
                })
            }
        };

        let name = match claims.get("name") {
            None | Some(Value::Null) => return Err(ClaimsError::Missing("name")),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(ClaimsError::WrongType {
                    claim: "name",
                    expected: "string",
                })
            }
        };

        Ok(Identity::new(id, name))
    }
}

fn number_to_id(n: &serde_json::Number) -> Result<i64, ClaimsError> {
    let id = if let Some(i) = n.as_i64() {
        i
    } else {
        match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= 1.0 && f <= i64::MAX as f64 => f as i64,
            _ => return Err(ClaimsError::OutOfRange("id")),
        }
    };

    if id < 1 {
        return Err(ClaimsError::OutOfRange("id"));
    }
    Ok(id)
}
