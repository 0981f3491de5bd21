use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::permissions::{Permission, PermissionSet};

/// Role identifier carried in session claims.
///
/// Roles are opaque strings at this layer; [`RolePolicy`] maps them to
/// permission tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role → permission grants.
///
/// Unknown roles grant nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RolePolicy {
    grants: HashMap<Role, Vec<Permission>>,
}

impl RolePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants shipped with the application.
    pub fn standard() -> Self {
        Self::new()
            .grant(Role::new("admin"), ["*"])
            .grant(
                Role::new("manager"),
                ["tasks:*", "curricula:*", "expenses:*", "users:view", "roles:view"],
            )
            .grant(
                Role::new("member"),
                ["tasks:view", "curricula:view", "expenses:create"],
            )
    }

    pub fn grant<I>(mut self, role: Role, permissions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Permission>,
    {
        self.grants
            .entry(role)
            .or_default()
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn permissions_for(&self, roles: &[Role]) -> PermissionSet {
        roles
            .iter()
            .filter_map(|role| self.grants.get(role))
            .flatten()
            .cloned()
            .collect()
    }
}
