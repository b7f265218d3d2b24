//! Request-facing authentication gateway
//!
//! [`AuthGateway`] has two entry points:
//!
//! - **Login**: bind the body for the endpoint's [`LoginType`], verify the
//!   credentials, encode the identity into claims and sign a token.
//! - **Request authentication**: find the token, verify signature and
//!   expiry, decode the identity, authorize it and attach it to the request.
//!
//! The gateway holds no mutable state. Clones share the same issuer and
//! collaborators.

use crate::audit::ClientInfo;
use crate::claims::Identity;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::jwt::{IssuedToken, TokenIssuer};
use crate::login::{LoginRequest, LoginType};
use crate::lookup::TokenLookup;
use crate::response::AuthResponse;
use crate::verifier::CredentialVerifier;
use http::Request;
use std::future::Future;
use std::sync::Arc;

/// Decides whether an authenticated identity may proceed.
pub trait Authorizator: Send + Sync {
    /// Return `true` to allow the request.
    fn authorize(&self, identity: &Identity) -> bool;
}

/// Allows every identity that decoded successfully.
///
/// Per-route permissions are checked by handlers, not here.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAuthenticated;

impl Authorizator for AllowAuthenticated {
    fn authorize(&self, identity: &Identity) -> bool {
        identity.is_valid()
    }
}

/// Authentication gateway.
#[derive(Clone)]
pub struct AuthGateway {
    issuer: Arc<TokenIssuer>,
    verifier: CredentialVerifier,
    lookup: TokenLookup,
    realm: String,
    authorizator: Arc<dyn Authorizator>,
}

impl std::fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway")
            .field("issuer", &self.issuer)
            .field("verifier", &self.verifier)
            .field("lookup", &self.lookup)
            .field("realm", &self.realm)
            .finish()
    }
}

impl AuthGateway {
    /// Create a gateway with the default token lookup and realm.
    pub fn new(issuer: Arc<TokenIssuer>, verifier: CredentialVerifier) -> Self {
        Self {
            issuer,
            verifier,
            lookup: TokenLookup::default(),
            realm: "Jwt".to_string(),
            authorizator: Arc::new(AllowAuthenticated),
        }
    }

    /// Build a gateway from configuration, loading the signing keys.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if validation fails or the keys cannot
    /// be read or parsed.
    pub fn from_config(config: &AuthConfig, verifier: CredentialVerifier) -> AuthResult<Self> {
        let issuer = TokenIssuer::new(config.jwt_config()?)?;
        Ok(Self::new(Arc::new(issuer), verifier)
            .with_lookup(config.token_lookup()?)
            .with_realm(config.realm.clone()))
    }

    /// Set the token lookup.
    pub fn with_lookup(mut self, lookup: TokenLookup) -> Self {
        self.lookup = lookup;
        self
    }

    /// Set the realm used in `WWW-Authenticate` challenges.
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    /// Set the authorizator.
    pub fn with_authorizator(mut self, authorizator: Arc<dyn Authorizator>) -> Self {
        self.authorizator = authorizator;
        self
    }

    /// Get the token issuer.
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Handle a login request for an endpoint of type `login_type`.
    ///
    /// Answers 200 with the token envelope, or the verifier's error envelope.
    pub async fn login<B: AsRef<[u8]>>(
        &self,
        login_type: LoginType,
        request: &Request<B>,
    ) -> AuthResponse {
        match self.try_login(login_type, request).await {
            Ok((identity, issued)) => {
                tracing::info!(
                    user_id = identity.id,
                    login_type = %login_type,
                    "Login succeeded"
                );
                AuthResponse::token(issued)
            }
            Err(e) => {
                if e.is_server_error() {
                    tracing::error!(login_type = %login_type, error = %e, "Login failed");
                } else {
                    tracing::warn!(
                        login_type = %login_type,
                        error_code = e.error_code(),
                        error = %e,
                        "Login failed"
                    );
                }
                self.reject(&e)
            }
        }
    }

    async fn try_login<B: AsRef<[u8]>>(
        &self,
        login_type: LoginType,
        request: &Request<B>,
    ) -> AuthResult<(Identity, IssuedToken)> {
        let client = ClientInfo::from_request(request);
        let login = LoginRequest::bind(login_type, request.body().as_ref())?;
        let identity = self.verifier.verify(&login, &client).await?;
        let issued = self.issuer.issue(&identity)?;
        Ok((identity, issued))
    }

    /// Handle a refresh request.
    ///
    /// The token is looked up like on any protected request. It may be
    /// expired as long as it is inside the refresh window.
    pub fn refresh<B>(&self, request: &Request<B>) -> AuthResponse {
        let result = self
            .lookup
            .extract(request)
            .and_then(|token| self.issuer.refresh(&token));

        match result {
            Ok(issued) => AuthResponse::token(issued),
            Err(e) => {
                tracing::debug!(error_code = e.error_code(), error = %e, "Token refresh rejected");
                self.reject(&e)
            }
        }
    }

    /// Authenticate a protected request.
    ///
    /// On success the identity is inserted into the request extensions and
    /// returned. On failure the rejection response is returned; the caller
    /// must not run the handler.
    pub fn authenticate<B>(&self, request: &mut Request<B>) -> Result<Identity, AuthResponse> {
        match self.try_authenticate(request) {
            Ok(identity) => {
                request.extensions_mut().insert(identity.clone());
                Ok(identity)
            }
            Err(e) => {
                tracing::debug!(error_code = e.error_code(), error = %e, "Request token rejected");
                Err(self.reject(&e))
            }
        }
    }

    fn try_authenticate<B>(&self, request: &Request<B>) -> AuthResult<Identity> {
        let token = self.lookup.extract(request)?;
        let verified = self.issuer.validate(&token)?;

        if !self.authorizator.authorize(&verified.identity) {
            return Err(AuthError::Forbidden);
        }
        Ok(verified.identity)
    }

    /// Authenticate a request and, only if that succeeds, run `handler`.
    pub async fn guard<B, F, Fut, R>(&self, mut request: Request<B>, handler: F) -> Result<R, AuthResponse>
    where
        F: FnOnce(Request<B>) -> Fut,
        Fut: Future<Output = R>,
    {
        self.authenticate(&mut request)?;
        Ok(handler(request).await)
    }

    fn reject(&self, err: &AuthError) -> AuthResponse {
        AuthResponse::error(err).with_challenge(&self.realm)
    }
}

/// Identity attached to a request by [`AuthGateway::authenticate`].
pub fn current_identity<B>(request: &Request<B>) -> Option<&Identity> {
    request.extensions().get::<Identity>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::JwtConfig;
    use crate::login::PasswordCredentials;
    use crate::services::{LookupFailure, UserLookupService};
    use async_trait::async_trait;
    use http::header::AUTHORIZATION;
    use http::StatusCode;

    const PRIVATE_KEY: &str = include_str!("../tests/fixtures/signing_private.pem");
    const PUBLIC_KEY: &str = include_str!("../tests/fixtures/signing_public.pem");

    struct AliceOnly;

    #[async_trait]
    impl UserLookupService for AliceOnly {
        async fn verify_password(
            &self,
            credentials: &PasswordCredentials,
        ) -> Result<Identity, LookupFailure> {
            match (credentials.username.as_str(), credentials.password.as_str()) {
                ("alice", "correct") => Ok(Identity::new(42, "alice")),
                ("mallory", _) => Err(LookupFailure::rejected(403, "account disabled")),
                _ => Err(LookupFailure::Unspecified),
            }
        }
    }

    struct DenyAll;

    impl Authorizator for DenyAll {
        fn authorize(&self, _: &Identity) -> bool {
            false
        }
    }

    fn gateway() -> AuthGateway {
        let issuer = TokenIssuer::new(JwtConfig::new(PRIVATE_KEY, PUBLIC_KEY)).unwrap();
        AuthGateway::new(
            Arc::new(issuer),
            CredentialVerifier::new().with_user_lookup(Arc::new(AliceOnly)),
        )
    }

    fn login_request(body: &str) -> Request<Vec<u8>> {
        Request::post("/api/login")
            .body(body.as_bytes().to_vec())
            .unwrap()
    }

    fn bearer(token: &str) -> Request<()> {
        Request::get("/api/me")
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .body(())
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_success() {
        let response = gateway()
            .login(
                LoginType::Password,
                &login_request(r#"{"username":"alice","password":"correct"}"#),
            )
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["message"], "success");
        assert!(response.body["data"]["token"].is_string());
        assert!(response.body["data"]["expire"].is_string());
    }

    #[tokio::test]
    async fn test_login_forwards_backend_reason() {
        let response = gateway()
            .login(
                LoginType::Password,
                &login_request(r#"{"username":"mallory","password":"x"}"#),
            )
            .await;

        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.body["code"], 403);
        assert_eq!(response.body["message"], "account disabled");
    }

    #[tokio::test]
    async fn test_login_generic_failure() {
        let response = gateway()
            .login(
                LoginType::Password,
                &login_request(r#"{"username":"alice","password":"wrong"}"#),
            )
            .await;

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["message"], "incorrect Username or Password");
        assert_eq!(response.headers["www-authenticate"], "JWT realm=Jwt");
    }

    #[tokio::test]
    async fn test_login_binding_error() {
        let gateway = gateway();
        for (body, message) in [
            ("not json", "invalid login request body"),
            (r#"{"username":"alice"}"#, "missing Username or Password"),
        ] {
            let response = gateway.login(LoginType::Password, &login_request(body)).await;

            assert_eq!(response.status, StatusCode::UNAUTHORIZED);
            assert_eq!(response.body["code"], 401);
            assert_eq!(response.body["message"], message);
        }
    }

    #[test]
    fn test_from_config_rejects_oversized_timeout() {
        let fixtures = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        let config = AuthConfig {
            public_key_file: Some(fixtures.join("signing_public.pem")),
            private_key_file: Some(fixtures.join("signing_private.pem")),
            timeout_secs: i64::MAX,
            max_refresh_secs: i64::MAX,
            ..AuthConfig::default()
        };

        assert!(matches!(
            AuthGateway::from_config(&config, CredentialVerifier::new()),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_authenticate_attaches_identity() {
        let gateway = gateway();
        let issued = gateway.issuer().issue(&Identity::new(42, "alice")).unwrap();

        let mut request = bearer(&issued.token);
        let identity = gateway.authenticate(&mut request).unwrap();

        assert_eq!(identity, Identity::new(42, "alice"));
        assert_eq!(current_identity(&request), Some(&identity));
    }

    #[test]
    fn test_authenticate_missing_token() {
        let mut request = Request::get("/api/me").body(()).unwrap();
        let response = gateway().authenticate(&mut request).unwrap_err();

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["message"], "token not found in request");
        assert!(current_identity(&request).is_none());
    }

    #[test]
    fn test_authorizator_can_forbid() {
        let gateway = gateway().with_authorizator(Arc::new(DenyAll));
        let issued = gateway.issuer().issue(&Identity::new(42, "alice")).unwrap();

        let response = gateway.authenticate(&mut bearer(&issued.token)).unwrap_err();
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(
            response.body["message"],
            "you don't have permission to access this resource"
        );
    }

    #[test]
    fn test_refresh() {
        let gateway = gateway();
        let issued = gateway
            .issuer()
            .issue_at(&Identity::new(42, "alice"), chrono::Utc::now() - chrono::Duration::days(3))
            .unwrap();

        let response = gateway.refresh(&bearer(&issued.token));
        assert_eq!(response.status, StatusCode::OK);

        let token = response.body["data"]["token"].as_str().unwrap();
        let identity = gateway.authenticate(&mut bearer(token)).unwrap();
        assert_eq!(identity.id, 42);
    }
}
