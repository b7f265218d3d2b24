//! Error types for login, token and claims operations
//!
//! Every failure the gateway can answer with is an [`AuthError`]. Each variant
//! knows its HTTP status, a stable code for logs, and the message a client is
//! allowed to see.

use thiserror::Error;

/// Claims decoding failures.
///
/// Produced when a verified token carries a claim set that does not match
/// the identity schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimsError {
    /// A required claim is absent
    #[error("missing claim `{0}`")]
    Missing(&'static str),

    /// A claim is present with the wrong JSON type
    #[error("claim `{claim}` is not a {expected}")]
    WrongType {
        /// Claim name
        claim: &'static str,
        /// Expected type
        expected: &'static str,
    },

    /// A numeric claim is outside its valid range
    #[error("claim `{0}` is out of range")]
    OutOfRange(&'static str),
}

/// Authentication error types.
///
/// Covers request binding, credential verification against the three
/// identity sources, and token validation on protected requests.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Login body could not be bound to the expected shape
    #[error("{0}")]
    Binding(String),

    /// The user store rejected the credentials with a specific reason
    #[error("{message}")]
    CredentialRejected {
        /// HTTP status reported by the user store
        status: u16,
        /// Reason reported by the user store
        message: String,
    },

    /// Credentials rejected without a specific reason
    #[error("incorrect Username or Password")]
    AuthenticationFailed,

    /// OAuth login with a provider this gateway does not implement
    #[error("unsupported OAuth provider: {0}")]
    OAuthProviderUnsupported(String),

    /// OAuth authorization code could not be exchanged for a user
    #[error("OAuth exchange failed: {0}")]
    OAuthExchangeFailed(String),

    /// No token in any configured lookup location
    #[error("token not found in request")]
    TokenMissing,

    /// Authorization header present but not `<head> <token>`
    #[error("auth header is invalid")]
    InvalidAuthHeader,

    /// Token signature does not verify against the public key
    #[error("signature is invalid")]
    TokenSignatureInvalid,

    /// Token expired (and, for refresh, past the refresh window)
    #[error("token is expired")]
    TokenExpired,

    /// Token is structurally invalid
    #[error("malformed token: {0}")]
    TokenMalformed(String),

    /// Token verified but its claims do not decode to an identity
    #[error("claims decode error: {0}")]
    ClaimsDecode(#[from] ClaimsError),

    /// Identity is not allowed to access the resource
    #[error("you don't have permission to access this resource")]
    Forbidden,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(self, AuthError::Internal(_) | AuthError::Config(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::CredentialRejected { status, .. } => *status,

            AuthError::Binding(_)
            | AuthError::AuthenticationFailed
            | AuthError::OAuthProviderUnsupported(_)
            | AuthError::OAuthExchangeFailed(_)
            | AuthError::TokenMissing
            | AuthError::InvalidAuthHeader
            | AuthError::TokenSignatureInvalid
            | AuthError::TokenExpired
            | AuthError::TokenMalformed(_)
            | AuthError::ClaimsDecode(_) => 401,

            AuthError::Forbidden => 403,

            AuthError::Config(_) | AuthError::Internal(_) => 500,
        }
    }

    /// Get error code for logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Binding(_) => "BINDING_ERROR",
            AuthError::CredentialRejected { .. } => "CREDENTIAL_REJECTED",
            AuthError::AuthenticationFailed => "AUTHENTICATION_FAILED",
            AuthError::OAuthProviderUnsupported(_) => "OAUTH_PROVIDER_UNSUPPORTED",
            AuthError::OAuthExchangeFailed(_) => "OAUTH_EXCHANGE_FAILED",
            AuthError::TokenMissing => "TOKEN_MISSING",
            AuthError::InvalidAuthHeader => "INVALID_AUTH_HEADER",
            AuthError::TokenSignatureInvalid => "TOKEN_SIGNATURE_INVALID",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenMalformed(_) => "TOKEN_MALFORMED",
            AuthError::ClaimsDecode(_) => "CLAIMS_DECODE_ERROR",
            AuthError::Forbidden => "FORBIDDEN",
            AuthError::Config(_) => "CONFIG_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to the client.
    ///
    /// Verifier errors are actionable and pass through. Token, claims and
    /// server errors collapse to fixed text so no key material or library
    /// detail reaches the response.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::TokenMalformed(_) => "token is malformed".to_string(),
            AuthError::ClaimsDecode(_) => "token claims are invalid".to_string(),
            AuthError::OAuthExchangeFailed(_) => "OAuth login failed".to_string(),
            AuthError::Config(_) | AuthError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}
