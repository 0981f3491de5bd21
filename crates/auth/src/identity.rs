//! Resolved actor identity.
//!
//! An [`Identity`] is built per request from verified claims and discarded
//! once the request has been evaluated; nothing here persists it.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatehouse_core::{SubjectId, TenantId};

use crate::claims::SessionClaims;
use crate::permissions::{Permission, PermissionSet};
use crate::roles::RolePolicy;

/// Account lifecycle state as reported by the identity source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Banned,
    Pending,
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AccountStatus::Active => f.write_str("active"),
            AccountStatus::Banned => f.write_str("banned"),
            AccountStatus::Pending => f.write_str("pending"),
        }
    }
}

/// The verified actor making a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject: SubjectId,
    pub tenant_id: TenantId,
    pub permissions: PermissionSet,
    pub must_change_password: bool,
    pub status: AccountStatus,
}

impl Identity {
    /// An active identity with no permissions and no pending password change.
    pub fn new(subject: SubjectId, tenant_id: TenantId) -> Self {
        Self {
            subject,
            tenant_id,
            permissions: PermissionSet::new(),
            must_change_password: false,
            status: AccountStatus::Active,
        }
    }

    pub fn with_permissions<I>(mut self, permissions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Permission>,
    {
        self.permissions.extend(permissions);
        self
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    pub fn requiring_password_change(mut self) -> Self {
        self.must_change_password = true;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityLookupError {
    /// The token names a subject the identity source does not know.
    #[error("unknown subject {0}")]
    UnknownSubject(SubjectId),

    #[error("identity source unavailable: {0}")]
    Unavailable(String),
}

/// Turns verified claims into a full [`Identity`] (permissions, status).
///
/// Implementations may call out to an identity endpoint; `token` is the raw
/// session token so it can be forwarded as a bearer credential.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(
        &self,
        claims: &SessionClaims,
        token: &str,
    ) -> Result<Identity, IdentityLookupError>;
}

/// Resolves identities from the claims alone (no network).
///
/// Every subject is considered active; permissions come from the role policy.
#[derive(Debug, Clone, Default)]
pub struct ClaimsIdentityResolver {
    roles: RolePolicy,
}

impl ClaimsIdentityResolver {
    pub fn new(roles: RolePolicy) -> Self {
        Self { roles }
    }
}

#[async_trait]
impl IdentityResolver for ClaimsIdentityResolver {
    async fn resolve(
        &self,
        claims: &SessionClaims,
        _token: &str,
    ) -> Result<Identity, IdentityLookupError> {
        Ok(Identity {
            subject: claims.sub,
            tenant_id: claims.tenant_id,
            permissions: self.roles.permissions_for(&claims.roles),
            must_change_password: claims.must_change_password,
            status: AccountStatus::Active,
        })
    }
}

/// Per-subject account state held by [`InMemoryIdentityDirectory`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountRecord {
    pub status: AccountStatus,
    pub extra_permissions: PermissionSet,
    pub must_change_password: bool,
}

/// In-memory identity source (dev/test).
///
/// Only registered subjects resolve. Role grants from the claims are merged
/// with the record's extra permissions; the password flag is set when either
/// the claims or the record demand it.
#[derive(Debug, Default)]
pub struct InMemoryIdentityDirectory {
    roles: RolePolicy,
    accounts: RwLock<HashMap<SubjectId, AccountRecord>>,
}

impl InMemoryIdentityDirectory {
    pub fn new(roles: RolePolicy) -> Self {
        Self {
            roles,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, subject: SubjectId, record: AccountRecord) {
        self.accounts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(subject, record);
    }

    pub fn set_status(&self, subject: SubjectId, status: AccountStatus) -> bool {
        let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
        match accounts.get_mut(&subject) {
            Some(record) => {
                record.status = status;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl IdentityResolver for InMemoryIdentityDirectory {
    async fn resolve(
        &self,
        claims: &SessionClaims,
        _token: &str,
    ) -> Result<Identity, IdentityLookupError> {
        let record = self
            .accounts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&claims.sub)
            .cloned()
            .ok_or(IdentityLookupError::UnknownSubject(claims.sub))?;

        let mut permissions = self.roles.permissions_for(&claims.roles);
        permissions.extend(record.extra_permissions.iter().cloned());

        Ok(Identity {
            subject: claims.sub,
            tenant_id: claims.tenant_id,
            permissions,
            must_change_password: claims.must_change_password || record.must_change_password,
            status: record.status,
        })
    }
}
