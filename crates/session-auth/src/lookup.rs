//! Token lookup on incoming requests
//!
//! A lookup is an ordered list of request locations, written as
//! `"header: Authorization, query: token, cookie: jwt"`. The first location
//! holding a usable token wins.

use crate::error::{AuthError, AuthResult};
use http::header::COOKIE;
use http::Request;

/// Default lookup order.
pub const DEFAULT_TOKEN_LOOKUP: &str = "header: Authorization, query: token, cookie: jwt";

/// Default scheme expected in the Authorization header.
pub const DEFAULT_TOKEN_HEAD_NAME: &str = "Bearer";

/// A place a token may be carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Request header, value `<head-name> <token>`
    Header(String),
    /// Query parameter
    Query(String),
    /// Cookie
    Cookie(String),
}

/// Ordered token locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLookup {
    sources: Vec<TokenSource>,
    head_name: String,
}

impl Default for TokenLookup {
    fn default() -> Self {
        Self {
            sources: vec![
                TokenSource::Header("Authorization".to_string()),
                TokenSource::Query("token".to_string()),
                TokenSource::Cookie("jwt".to_string()),
            ],
            head_name: DEFAULT_TOKEN_HEAD_NAME.to_string(),
        }
    }
}

impl TokenLookup {
    /// Parse a lookup string such as `"header: Authorization, cookie: jwt"`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty list, an unknown source or
    /// an entry without a name.
    pub fn parse(lookup: &str, head_name: impl Into<String>) -> AuthResult<Self> {
        let mut sources = Vec::new();

        for entry in lookup.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (kind, name) = entry
                .split_once(':')
                .map(|(k, n)| (k.trim(), n.trim()))
                .filter(|(_, n)| !n.is_empty())
                .ok_or_else(|| AuthError::Config(format!("invalid token lookup entry: {}", entry)))?;

            let source = match kind.to_lowercase().as_str() {
                "header" => TokenSource::Header(name.to_string()),
                "query" => TokenSource::Query(name.to_string()),
                "cookie" => TokenSource::Cookie(name.to_string()),
                other => {
                    return Err(AuthError::Config(format!("unknown token lookup source: {}", other)))
                }
            };
            sources.push(source);
        }

        if sources.is_empty() {
            return Err(AuthError::Config("token lookup is empty".to_string()));
        }

        Ok(Self {
            sources,
            head_name: head_name.into(),
        })
    }

    /// Configured locations, in order.
    pub fn sources(&self) -> &[TokenSource] {
        &self.sources
    }

    /// Find the token in a request.
    ///
    /// # Errors
    ///
    /// - `InvalidAuthHeader` if a header was present but not `<head> <token>`
    ///   and no later location carried a token
    /// - `TokenMissing` if no location carried anything
    pub fn extract<B>(&self, request: &Request<B>) -> AuthResult<String> {
        let mut header_error = None;

        for source in &self.sources {
            let found = match source {
                TokenSource::Header(name) => match self.header_token(request, name) {
                    Ok(token) => token,
                    Err(e) => {
                        header_error = Some(e);
                        None
                    }
                },
                TokenSource::Query(name) => query_token(request, name),
                TokenSource::Cookie(name) => cookie_token(request, name),
            };

            if let Some(token) = found {
                return Ok(token);
            }
        }

        Err(header_error.unwrap_or(AuthError::TokenMissing))
    }

    fn header_token<B>(&self, request: &Request<B>, name: &str) -> AuthResult<Option<String>> {
        let Some(value) = request.headers().get(name) else {
            return Ok(None);
        };
        let value = value.to_str().map_err(|_| AuthError::InvalidAuthHeader)?.trim();
        if value.is_empty() {
            return Ok(None);
        }

        match value.split_once(' ') {
            Some((scheme, token)) if scheme == self.head_name && !token.trim().is_empty() => {
                Ok(Some(token.trim().to_string()))
            }
            _ => Err(AuthError::InvalidAuthHeader),
        }
    }
}

fn query_token<B>(request: &Request<B>, name: &str) -> Option<String> {
    request.uri().query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key != name || value.is_empty() {
            return None;
        }
        urlencoding::decode(value).ok().map(|v| v.into_owned())
    })
}

fn cookie_token<B>(request: &Request<B>, name: &str) -> Option<String> {
    request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_parse_default() {
        let lookup = TokenLookup::parse(DEFAULT_TOKEN_LOOKUP, "Bearer").unwrap();
        assert_eq!(lookup, TokenLookup::default());
    }

    #[test]
    fn test_parse_errors() {
        assert!(TokenLookup::parse("", "Bearer").is_err());
        assert!(TokenLookup::parse("form: token", "Bearer").is_err());
        assert!(TokenLookup::parse("header:", "Bearer").is_err());
        assert!(TokenLookup::parse("header", "Bearer").is_err());
    }

    #[test]
    fn test_header_wins() {
        let lookup = TokenLookup::default();
        let req = request(
            "/api/users?token=from-query",
            &[("authorization", "Bearer from-header"), ("cookie", "jwt=from-cookie")],
        );
        assert_eq!(lookup.extract(&req).unwrap(), "from-header");
    }

    #[test]
    fn test_query_then_cookie() {
        let lookup = TokenLookup::default();

        let req = request("/api/users?page=2&token=a%2Eb", &[("cookie", "jwt=from-cookie")]);
        assert_eq!(lookup.extract(&req).unwrap(), "a.b");

        let req = request("/api/users", &[("cookie", "theme=dark; jwt=from-cookie")]);
        assert_eq!(lookup.extract(&req).unwrap(), "from-cookie");
    }

    #[test]
    fn test_malformed_header() {
        let lookup = TokenLookup::default();

        let req = request("/api/users", &[("authorization", "Basic dXNlcjpwYXNz")]);
        assert!(matches!(lookup.extract(&req), Err(AuthError::InvalidAuthHeader)));

        let req = request("/api/users", &[("authorization", "Bearer")]);
        assert!(matches!(lookup.extract(&req), Err(AuthError::InvalidAuthHeader)));

        // A later location still supplies the token.
        let req = request("/api/users?token=t", &[("authorization", "Basic x")]);
        assert_eq!(lookup.extract(&req).unwrap(), "t");
    }

    #[test]
    fn test_missing_token() {
        let lookup = TokenLookup::default();
        let req = request("/api/users?page=1", &[]);
        assert!(matches!(lookup.extract(&req), Err(AuthError::TokenMissing)));
    }

    #[test]
    fn test_custom_head_name() {
        let lookup = TokenLookup::parse("header: X-Session", "Token").unwrap();
        let req = request("/", &[("x-session", "Token abc")]);
        assert_eq!(lookup.extract(&req).unwrap(), "abc");
        assert_eq!(lookup.sources(), &[TokenSource::Header("X-Session".to_string())]);
    }
}
