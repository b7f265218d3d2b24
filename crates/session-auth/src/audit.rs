//! Login audit records
//!
//! One [`LoginAuditRecord`] is written per login attempt that reaches an
//! identity source. Client metadata is captured from the request before the
//! verifier runs.

use crate::login::{LoginRequest, OAuthProvider};
use chrono::{DateTime, Utc};
use http::header::USER_AGENT;
use http::{HeaderMap, Request};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Client metadata of a login request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// User-Agent header
    pub user_agent: String,

    /// Client IP address
    pub ip: String,

    /// `"<METHOD> <request-uri>"`
    pub operation: String,
}

impl ClientInfo {
    /// Capture client metadata from a request.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let user_agent = request
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let remote = request.extensions().get::<SocketAddr>().copied();

        Self {
            user_agent,
            ip: client_ip(request.headers(), remote).unwrap_or_default(),
            operation: format!("{} {}", request.method(), request.uri()),
        }
    }
}

/// Resolve the client IP: first `X-Forwarded-For` hop, then `X-Real-IP`, then
/// the peer address.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return Some(ip.to_string());
    }

    remote.map(|addr| addr.ip().to_string())
}

/// Where a login came from, as written to the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginPlatform {
    /// Password login against the user store
    Standard,
    /// Directory login
    Ldap,
    /// DingTalk OAuth login
    DingTalk,
}

impl LoginPlatform {
    /// Platform for a bound request, if it is audited.
    ///
    /// OAuth logins naming an unsupported provider are not audited.
    pub fn for_request(request: &LoginRequest) -> Option<Self> {
        match request {
            LoginRequest::Password(_) => Some(LoginPlatform::Standard),
            LoginRequest::Directory(_) => Some(LoginPlatform::Ldap),
            LoginRequest::OAuth {
                provider: OAuthProvider::DingTalk,
                ..
            } => Some(LoginPlatform::DingTalk),
            LoginRequest::OAuth {
                provider: OAuthProvider::Unsupported(_),
                ..
            } => None,
        }
    }

    /// Platform label.
    pub fn label(&self) -> &'static str {
        match self {
            LoginPlatform::Standard => "Standard Login",
            LoginPlatform::Ldap => "LDAP Login",
            LoginPlatform::DingTalk => "DingTalk Login",
        }
    }

    /// Result label.
    pub fn result_label(&self, success: bool) -> &'static str {
        match (self, success) {
            (LoginPlatform::Standard, true) => "Standard Login Success",
            (LoginPlatform::Standard, false) => "Standard Login Failed",
            (LoginPlatform::Ldap, true) => "LDAP Login Success",
            (LoginPlatform::Ldap, false) => "LDAP Login Failed",
            (LoginPlatform::DingTalk, true) => "DingTalk login success",
            (LoginPlatform::DingTalk, false) => "DingTalk login failed",
        }
    }
}

/// One login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAuditRecord {
    /// Authenticated user, absent on failure
    pub user_id: Option<i64>,

    /// User-Agent of the client
    pub client: String,

    /// Client IP address
    pub ip: String,

    /// Geolocation of `ip`; lookup is not implemented and this is always `None`
    pub ip_location: Option<String>,

    /// Always 1
    pub login_status: i32,

    /// Platform label, e.g. "LDAP Login"
    pub platform: String,

    /// Result label, e.g. "LDAP Login Success"
    pub login_result: String,

    /// `"<METHOD> <request-uri>"`
    pub operation: String,

    /// When the attempt finished
    pub timestamp: DateTime<Utc>,
}

impl LoginAuditRecord {
    /// Build a record for an attempt on `platform`.
    pub fn new(
        client: &ClientInfo,
        platform: LoginPlatform,
        user_id: Option<i64>,
        success: bool,
    ) -> Self {
        Self {
            user_id,
            client: client.user_agent.clone(),
            ip: client.ip.clone(),
            ip_location: None,
            login_status: 1,
            platform: platform.label().to_string(),
            login_result: platform.result_label(success).to_string(),
            operation: client.operation.clone(),
            timestamp: Utc::now(),
        }
    }
}
