//! JSON response envelopes
//!
//! Success: `{"code": 200, "data": {"token": ..., "expire": ...}, "message": "success"}`.
//! Failure: `{"code": <status>, "message": ...}`.

use crate::error::AuthError;
use crate::jwt::IssuedToken;
use http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a successful login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEnvelope {
    /// HTTP status, repeated in the body
    pub code: u16,
    /// Issued token
    pub data: IssuedToken,
    /// Always "success"
    pub message: String,
}

/// Body of any failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// HTTP status, repeated in the body
    pub code: u16,
    /// Client-facing message
    pub message: String,
}

/// A status and JSON body, independent of any web framework.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    /// HTTP status
    pub status: StatusCode,
    /// JSON body
    pub body: Value,
    /// Extra headers
    pub headers: HeaderMap,
}

impl AuthResponse {
    /// 200 with the token envelope.
    pub fn token(issued: IssuedToken) -> Self {
        let envelope = TokenEnvelope {
            code: StatusCode::OK.as_u16(),
            data: issued,
            message: "success".to_string(),
        };
        Self {
            status: StatusCode::OK,
            body: serde_json::to_value(envelope).unwrap_or(Value::Null),
            headers: HeaderMap::new(),
        }
    }

    /// Error envelope with the error's status and client message.
    pub fn error(err: &AuthError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::UNAUTHORIZED);
        let envelope = ErrorEnvelope {
            code: status.as_u16(),
            message: err.client_message(),
        };
        Self {
            status,
            body: serde_json::to_value(envelope).unwrap_or(Value::Null),
            headers: HeaderMap::new(),
        }
    }

    /// Add a `WWW-Authenticate` challenge for `realm` if this is a 401.
    pub fn with_challenge(mut self, realm: &str) -> Self {
        if self.status == StatusCode::UNAUTHORIZED {
            if let Ok(value) = HeaderValue::from_str(&format!("JWT realm={}", realm)) {
                self.headers.insert(WWW_AUTHENTICATE, value);
            }
        }
        self
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Convert into an `http` response with a JSON body.
    pub fn into_http(self) -> Response<String> {
        let mut response = Response::new(self.body.to_string());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        response
    }
}

impl From<AuthError> for AuthResponse {
    fn from(err: AuthError) -> Self {
        AuthResponse::error(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_token_envelope() {
        let expire = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let response = AuthResponse::token(IssuedToken {
            token: "t".to_string(),
            expire,
        });

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["code"], 200);
        assert_eq!(response.body["message"], "success");
        assert_eq!(response.body["data"]["token"], "t");
        assert_eq!(response.body["data"]["expire"], "2026-01-02T03:04:05Z");
    }

    #[test]
    fn test_error_envelope() {
        let response = AuthResponse::error(&AuthError::CredentialRejected {
            status: 403,
            message: "account disabled".to_string(),
        });

        let envelope: ErrorEnvelope = serde_json::from_value(response.body.clone()).unwrap();
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(
            envelope,
            ErrorEnvelope {
                code: 403,
                message: "account disabled".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_backend_status_falls_back_to_unauthorized() {
        let response = AuthResponse::from(AuthError::CredentialRejected {
            status: 42,
            message: "nope".to_string(),
        });
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["code"], 401);
    }

    #[test]
    fn test_challenge_only_on_unauthorized() {
        let response = AuthResponse::error(&AuthError::TokenExpired).with_challenge("Jwt");
        assert_eq!(response.headers[WWW_AUTHENTICATE], "JWT realm=Jwt");

        let response = AuthResponse::error(&AuthError::Forbidden).with_challenge("Jwt");
        assert!(response.headers.get(WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn test_into_http() {
        let response = AuthResponse::error(&AuthError::TokenExpired)
            .with_challenge("Jwt")
            .into_http();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "JWT realm=Jwt");
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
        assert_eq!(response.body(), r#"{"code":401,"message":"token is expired"}"#);
    }
}
