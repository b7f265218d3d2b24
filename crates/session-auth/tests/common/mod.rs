//! Stub collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use session_auth::{
    AuditLogService, AuthGateway, BoxError, CredentialVerifier, DirectoryService, Identity,
    JwtConfig, LoginAuditRecord, LookupFailure, OAuthExchangeService, PasswordCredentials,
    TokenIssuer, UserLookupService,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SIGNING_PRIVATE_KEY: &str = include_str!("../fixtures/signing_private.pem");
pub const SIGNING_PUBLIC_KEY: &str = include_str!("../fixtures/signing_public.pem");
pub const FOREIGN_PRIVATE_KEY: &str = include_str!("../fixtures/foreign_private.pem");
pub const FOREIGN_PUBLIC_KEY: &str = include_str!("../fixtures/foreign_public.pem");

/// User store with a single account.
pub struct StubUserStore {
    pub username: String,
    pub password: String,
    pub identity: Identity,
}

impl StubUserStore {
    pub fn new(username: &str, password: &str, id: i64) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            identity: Identity::new(id, username),
        }
    }
}

#[async_trait]
impl UserLookupService for StubUserStore {
    async fn verify_password(
        &self,
        credentials: &PasswordCredentials,
    ) -> Result<Identity, LookupFailure> {
        if credentials.username != self.username {
            return Err(LookupFailure::rejected(401, "user does not exist"));
        }
        if credentials.password != self.password {
            return Err(LookupFailure::rejected(401, "wrong password"));
        }
        Ok(self.identity.clone())
    }
}

/// Directory accepting one username/password pair.
pub struct StubDirectory {
    pub username: String,
    pub password: String,
    pub identity: Identity,
}

#[async_trait]
impl DirectoryService for StubDirectory {
    async fn verify(&self, credentials: &PasswordCredentials) -> Option<Identity> {
        (credentials.username == self.username && credentials.password == self.password)
            .then(|| self.identity.clone())
    }
}

/// OAuth exchange returning a fixed outcome and counting calls.
pub struct StubExchange {
    pub outcome: Result<Identity, String>,
    pub calls: AtomicUsize,
}

impl StubExchange {
    pub fn returning(outcome: Result<Identity, String>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthExchangeService for StubExchange {
    async fn exchange(&self, _code: &str) -> Result<Identity, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone().map_err(Into::into)
    }
}

/// Audit log keeping every record in memory.
#[derive(Default)]
pub struct RecordingAuditLog {
    records: Mutex<Vec<LoginAuditRecord>>,
}

impl RecordingAuditLog {
    pub fn records(&self) -> Vec<LoginAuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditLogService for RecordingAuditLog {
    async fn record(&self, entry: LoginAuditRecord) -> Result<(), BoxError> {
        self.records.lock().unwrap().push(entry);
        Ok(())
    }
}

pub fn signing_issuer() -> TokenIssuer {
    TokenIssuer::new(JwtConfig::new(SIGNING_PRIVATE_KEY, SIGNING_PUBLIC_KEY)).unwrap()
}

pub fn foreign_issuer() -> TokenIssuer {
    TokenIssuer::new(JwtConfig::new(FOREIGN_PRIVATE_KEY, FOREIGN_PUBLIC_KEY)).unwrap()
}

pub fn gateway(verifier: CredentialVerifier) -> AuthGateway {
    AuthGateway::new(Arc::new(signing_issuer()), verifier)
}
