//! Login requests
//!
//! A login endpoint is configured with a [`LoginType`]; the request body is
//! bound to the matching [`LoginRequest`] variant. For OAuth the provider is
//! read from the body itself.

use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Login strategy selected by the endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LoginType {
    /// Username/password against the user store
    Password,
    /// Username/password against the directory service (LDAP)
    Directory,
    /// OAuth authorization code
    OAuth,
}

impl LoginType {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginType::Password => "password",
            LoginType::Directory => "directory",
            LoginType::OAuth => "oauth",
        }
    }
}

impl std::fmt::Display for LoginType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth providers a login body may name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OAuthProvider {
    /// DingTalk enterprise chat platform
    DingTalk,
    /// Any provider tag without an implementation
    Unsupported(String),
}

impl OAuthProvider {
    /// Parse a provider tag.
    ///
    /// Tags are case-insensitive. The legacy numeric tag `1` names DingTalk.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "dingtalk" | "1" => OAuthProvider::DingTalk,
            _ => OAuthProvider::Unsupported(tag.to_string()),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        match self {
            OAuthProvider::DingTalk => "dingtalk",
            OAuthProvider::Unsupported(tag) => tag,
        }
    }
}

/// Username and password.
#[derive(Clone)]
pub struct PasswordCredentials {
    /// Account name
    pub username: String,

    /// Plain-text password
    pub password: String,
}

impl std::fmt::Debug for PasswordCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl PasswordCredentials {
    /// Create new credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// A bound login request.
#[derive(Debug, Clone)]
pub enum LoginRequest {
    /// Password login
    Password(PasswordCredentials),
    /// Directory login
    Directory(PasswordCredentials),
    /// OAuth login
    OAuth {
        /// Provider named in the body
        provider: OAuthProvider,
        /// Authorization code
        code: String,
    },
}

#[derive(Deserialize)]
struct PasswordBody {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Deserialize)]
struct OAuthBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    provider: Option<Value>,
}

impl LoginRequest {
    /// Bind a JSON request body for the given login type.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Binding` if the body is not JSON of the expected
    /// shape or a required field is empty.
    pub fn bind(login_type: LoginType, body: &[u8]) -> AuthResult<Self> {
        match login_type {
            LoginType::Password => Ok(LoginRequest::Password(bind_password(body)?)),
            LoginType::Directory => Ok(LoginRequest::Directory(bind_password(body)?)),
            LoginType::OAuth => bind_oauth(body),
        }
    }

    /// Login type of this request.
    pub fn login_type(&self) -> LoginType {
        match self {
            LoginRequest::Password(_) => LoginType::Password,
            LoginRequest::Directory(_) => LoginType::Directory,
            LoginRequest::OAuth { .. } => LoginType::OAuth,
        }
    }
}

fn bind_password(body: &[u8]) -> AuthResult<PasswordCredentials> {
    let parsed: PasswordBody = serde_json::from_slice(body)
        .map_err(|_| AuthError::Binding("invalid login request body".to_string()))?;

    match (parsed.username, parsed.password) {
        (Some(username), Some(password)) if !username.trim().is_empty() && !password.is_empty() => {
            Ok(PasswordCredentials::new(username.trim(), password))
        }
        _ => Err(AuthError::Binding("missing Username or Password".to_string())),
    }
}

fn bind_oauth(body: &[u8]) -> AuthResult<LoginRequest> {
    let parsed: OAuthBody = serde_json::from_slice(body)
        .map_err(|_| AuthError::Binding("invalid login request body".to_string()))?;

    let provider = match parsed.provider {
        Some(Value::String(tag)) if !tag.trim().is_empty() => OAuthProvider::parse(&tag),
        Some(Value::Number(n)) => OAuthProvider::parse(&n.to_string()),
        _ => return Err(AuthError::Binding("missing OAuth provider type".to_string())),
    };

    let code = parsed.code.map(|c| c.trim().to_string()).unwrap_or_default();
    if code.is_empty() && !matches!(provider, OAuthProvider::Unsupported(_)) {
        return Err(AuthError::Binding("missing OAuth authorization code".to_string()));
    }

    Ok(LoginRequest::OAuth { provider, code })
}
