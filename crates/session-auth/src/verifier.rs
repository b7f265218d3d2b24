//! Credential verification
//!
//! [`CredentialVerifier`] authenticates a bound [`LoginRequest`] against the
//! identity source its variant names and records the attempt in the audit
//! log. Audit failures are logged and dropped; they never change the outcome
//! of a login.

use crate::audit::{ClientInfo, LoginAuditRecord, LoginPlatform};
use crate::claims::Identity;
use crate::error::{AuthError, AuthResult};
use crate::login::{LoginRequest, OAuthProvider, PasswordCredentials};
use crate::services::{
    AuditLogService, DirectoryService, LookupFailure, NoopAuditLog, OAuthExchangeService,
    UserLookupService,
};
use std::sync::Arc;

/// Verifies credentials against the injected identity sources.
#[derive(Clone)]
pub struct CredentialVerifier {
    user_lookup: Option<Arc<dyn UserLookupService>>,
    directory: Option<Arc<dyn DirectoryService>>,
    dingtalk: Option<Arc<dyn OAuthExchangeService>>,
    audit_log: Arc<dyn AuditLogService>,
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("user_lookup", &self.user_lookup.is_some())
            .field("directory", &self.directory.is_some())
            .field("dingtalk", &self.dingtalk.is_some())
            .finish()
    }
}

impl Default for CredentialVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialVerifier {
    /// Create a verifier with no identity sources and a no-op audit log.
    pub fn new() -> Self {
        Self {
            user_lookup: None,
            directory: None,
            dingtalk: None,
            audit_log: Arc::new(NoopAuditLog),
        }
    }

    /// Enable password login.
    pub fn with_user_lookup(mut self, service: Arc<dyn UserLookupService>) -> Self {
        self.user_lookup = Some(service);
        self
    }

    /// Enable directory login.
    pub fn with_directory(mut self, service: Arc<dyn DirectoryService>) -> Self {
        self.directory = Some(service);
        self
    }

    /// Enable DingTalk OAuth login.
    pub fn with_dingtalk(mut self, service: Arc<dyn OAuthExchangeService>) -> Self {
        self.dingtalk = Some(service);
        self
    }

    /// Set the audit log.
    pub fn with_audit_log(mut self, service: Arc<dyn AuditLogService>) -> Self {
        self.audit_log = service;
        self
    }

    /// Verify a login request.
    ///
    /// `client` must be captured before calling; it is written to the audit
    /// record whatever the outcome.
    pub async fn verify(&self, request: &LoginRequest, client: &ClientInfo) -> AuthResult<Identity> {
        let result = match request {
            LoginRequest::Password(credentials) => self.verify_password(credentials).await,
            LoginRequest::Directory(credentials) => self.verify_directory(credentials).await,
            LoginRequest::OAuth { provider, code } => self.verify_oauth(provider, code).await,
        };

        // Unconfigured sources never reached an identity store.
        if matches!(result, Err(AuthError::Config(_))) {
            return result;
        }

        if let Some(platform) = LoginPlatform::for_request(request) {
            let user_id = result.as_ref().ok().map(|identity| identity.id);
            let record = LoginAuditRecord::new(client, platform, user_id, result.is_ok());
            self.submit_audit(record).await;
        }

        result
    }

    async fn verify_password(&self, credentials: &PasswordCredentials) -> AuthResult<Identity> {
        let service = self
            .user_lookup
            .as_ref()
            .ok_or_else(|| AuthError::Config("password login is not configured".to_string()))?;

        match service.verify_password(credentials).await {
            Ok(identity) if identity.is_valid() => Ok(identity),
            Ok(_) | Err(LookupFailure::Unspecified) => Err(AuthError::AuthenticationFailed),
            Err(LookupFailure::Rejected { message, .. }) if message.trim().is_empty() => {
                Err(AuthError::AuthenticationFailed)
            }
            Err(LookupFailure::Rejected { status, message }) => {
                Err(AuthError::CredentialRejected { status, message })
            }
        }
    }

    async fn verify_directory(&self, credentials: &PasswordCredentials) -> AuthResult<Identity> {
        let service = self
            .directory
            .as_ref()
            .ok_or_else(|| AuthError::Config("directory login is not configured".to_string()))?;

        match service.verify(credentials).await {
            Some(identity) if identity.is_valid() => Ok(identity),
            _ => Err(AuthError::AuthenticationFailed),
        }
    }

    async fn verify_oauth(&self, provider: &OAuthProvider, code: &str) -> AuthResult<Identity> {
        match provider {
            OAuthProvider::DingTalk => {
                let service = self.dingtalk.as_ref().ok_or_else(|| {
                    AuthError::Config("DingTalk login is not configured".to_string())
                })?;

                match service.exchange(code).await {
                    Ok(identity) if identity.is_valid() => Ok(identity),
                    Ok(identity) => Err(AuthError::OAuthExchangeFailed(format!(
                        "exchange returned user id {}",
                        identity.id
                    ))),
                    Err(e) => Err(AuthError::OAuthExchangeFailed(e.to_string())),
                }
            }
            OAuthProvider::Unsupported(tag) => Err(AuthError::OAuthProviderUnsupported(tag.clone())),
        }
    }

    async fn submit_audit(&self, record: LoginAuditRecord) {
        let platform = record.platform.clone();
        if let Err(e) = self.audit_log.record(record).await {
            tracing::warn!(error = %e, platform = %platform, "Failed to write login audit record");
        }
    }
}
