//! # Session Authentication
//!
//! This crate issues and validates signed session tokens for an HTTP API.
//!
//! ## Overview
//!
//! The session-auth crate handles:
//! - **Login**: password (user store), directory (LDAP) and OAuth
//!   (DingTalk) strategies selected by the endpoint's login type
//! - **Claims**: identity encoded under both `id`/`name` and `uid`/`uname`
//! - **Tokens**: RS256 signing, validation, 24 hour lifetime, refresh for up
//!   to 90 days after issuance
//! - **Requests**: token lookup in the Authorization header, `token` query
//!   parameter or `jwt` cookie, identity attached to the request
//! - **Audit**: one record per login attempt, written best-effort
//!
//! Users, directories, OAuth providers and audit storage are external; they
//! are injected through the traits in [`services`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use session_auth::{AuthConfig, AuthGateway, CredentialVerifier, LoginType};
//! # use session_auth::services::UserLookupService;
//! # use std::sync::Arc;
//! # async fn run(user_store: Arc<dyn UserLookupService>) -> session_auth::AuthResult<()> {
//!
//! let verifier = CredentialVerifier::new().with_user_lookup(user_store);
//! let gateway = AuthGateway::from_config(&AuthConfig::from_env(), verifier)?;
//!
//! // Login endpoint
//! let request = http::Request::post("/api/login")
//!     .body(br#"{"username":"alice","password":"secret"}"#.to_vec())
//!     .unwrap();
//! let response = gateway.login(LoginType::Password, &request).await;
//!
//! // Protected endpoint
//! let mut request = http::Request::get("/api/me")
//!     .header("Authorization", "Bearer <token>")
//!     .body(())
//!     .unwrap();
//! match gateway.authenticate(&mut request) {
//!     Ok(identity) => println!("hello {}", identity.display_name),
//!     Err(rejection) => println!("{}", rejection.status),
//! }
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod claims;
pub mod config;
pub mod error;
pub mod gateway;
pub mod jwt;
pub mod login;
pub mod lookup;
pub mod response;
pub mod services;
pub mod verifier;

// Re-export main types
pub use audit::{ClientInfo, LoginAuditRecord, LoginPlatform};
pub use claims::{ClaimsCodec, Identity, IdentityClaims, SessionClaims};
pub use config::AuthConfig;
pub use error::{AuthError, AuthResult, ClaimsError};
pub use gateway::{current_identity, AllowAuthenticated, AuthGateway, Authorizator};
pub use jwt::{IssuedToken, JwtAlgorithm, JwtConfig, TokenIssuer, VerifiedToken};
pub use login::{LoginRequest, LoginType, OAuthProvider, PasswordCredentials};
pub use lookup::{TokenLookup, TokenSource};
pub use response::{AuthResponse, ErrorEnvelope, TokenEnvelope};
pub use services::{
    AuditLogService, BoxError, DirectoryService, LookupFailure, NoopAuditLog, OAuthExchangeService,
    UserLookupService,
};
pub use verifier::CredentialVerifier;
