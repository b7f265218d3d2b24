//! External collaborators
//!
//! The gateway does not own users, directories, OAuth providers or audit
//! storage. It reaches them through these traits, injected at construction
//! so deployments and tests can substitute their own implementations.

use crate::audit::LoginAuditRecord;
use crate::claims::Identity;
use crate::login::PasswordCredentials;
use async_trait::async_trait;

/// Boxed error returned by collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why the user store refused a password login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    /// Refused with a reason meant for the end user, e.g. "account disabled"
    Rejected {
        /// HTTP status to answer with
        status: u16,
        /// Reason shown to the user
        message: String,
    },
    /// Refused without a reason
    Unspecified,
}

impl LookupFailure {
    /// Create a rejection with a reason.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        LookupFailure::Rejected {
            status,
            message: message.into(),
        }
    }
}

/// User store holding password credentials.
#[async_trait]
pub trait UserLookupService: Send + Sync {
    /// Verify a username/password pair and return the stored identity.
    async fn verify_password(
        &self,
        credentials: &PasswordCredentials,
    ) -> Result<Identity, LookupFailure>;
}

/// Directory service (LDAP).
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Bind with the credentials; `None` if the directory refused them.
    async fn verify(&self, credentials: &PasswordCredentials) -> Option<Identity>;
}

/// OAuth authorization code exchange for one provider.
#[async_trait]
pub trait OAuthExchangeService: Send + Sync {
    /// Exchange an authorization code for the linked local identity.
    async fn exchange(&self, code: &str) -> Result<Identity, BoxError>;
}

/// Append-only store of login attempts.
#[async_trait]
pub trait AuditLogService: Send + Sync {
    /// Append one record.
    async fn record(&self, entry: LoginAuditRecord) -> Result<(), BoxError>;
}

/// Audit sink that drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditLog;

#[async_trait]
impl AuditLogService for NoopAuditLog {
    async fn record(&self, _entry: LoginAuditRecord) -> Result<(), BoxError> {
        Ok(())
    }
}
