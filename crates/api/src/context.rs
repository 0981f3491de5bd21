use gatehouse_auth::{AccountStatus, Identity, PermissionSet};
use gatehouse_core::{SubjectId, TenantId};

/// Tenant context for a request.
///
/// Present on every request the gatekeeper let through with a session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Principal context for a request (the resolved identity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    identity: Identity,
}

impl PrincipalContext {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn subject(&self) -> SubjectId {
        self.identity.subject
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.identity.permissions
    }

    pub fn status(&self) -> AccountStatus {
        self.identity.status
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}
