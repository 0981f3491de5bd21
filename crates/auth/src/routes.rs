//! Route table and longest-prefix route classification.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatehouse_core::Tier;

use crate::permissions::{Permission, PermissionSyntaxError};

/// One entry of the declarative route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    pub path: String,
    pub tier: Tier,
    #[serde(
        rename = "requiredPermissions",
        alias = "required_permissions",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub required_permissions: Vec<Permission>,
}

impl RouteRule {
    pub fn new(path: impl Into<String>, tier: Tier) -> Self {
        Self {
            path: path.into(),
            tier,
            required_permissions: Vec::new(),
        }
    }

    pub fn public(path: impl Into<String>) -> Self {
        Self::new(path, Tier::Public)
    }

    pub fn guest_only(path: impl Into<String>) -> Self {
        Self::new(path, Tier::GuestOnly)
    }

    pub fn private(path: impl Into<String>) -> Self {
        Self::new(path, Tier::Private)
    }

    pub fn requiring<I>(mut self, permissions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Permission>,
    {
        self.required_permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    /// `path` is this rule's path or lies underneath it (`/a` covers `/a/b`
    /// but not `/ab`).
    pub fn covers(&self, path: &str) -> bool {
        path.strip_prefix(self.path.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("route path '{0}' must start with '/'")]
    NotAbsolute(String),

    #[error("route path '{0}' must not end with '/'")]
    TrailingSlash(String),

    #[error("duplicate route path '{0}'")]
    Duplicate(String),

    #[error("route '{path}': {source}")]
    Permission {
        path: String,
        #[source]
        source: PermissionSyntaxError,
    },

    #[error("invalid route table document: {0}")]
    Parse(String),
}

/// Validated, immutable set of route rules in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>) -> Result<Self, RouteTableError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !rule.path.starts_with('/') {
                return Err(RouteTableError::NotAbsolute(rule.path.clone()));
            }
            if rule.path.len() > 1 && rule.path.ends_with('/') {
                return Err(RouteTableError::TrailingSlash(rule.path.clone()));
            }
            if !seen.insert(rule.path.as_str()) {
                return Err(RouteTableError::Duplicate(rule.path.clone()));
            }
            for permission in &rule.required_permissions {
                permission.form().map_err(|source| RouteTableError::Permission {
                    path: rule.path.clone(),
                    source,
                })?;
            }
        }
        Ok(Self { rules })
    }

    /// Parse a JSON array of `{path, tier, requiredPermissions?}` entries.
    pub fn from_json(document: &str) -> Result<Self, RouteTableError> {
        let rules: Vec<RouteRule> =
            serde_json::from_str(document).map_err(|e| RouteTableError::Parse(e.to_string()))?;
        Self::new(rules)
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}

/// Maps request paths to route rules, most specific rule first.
///
/// Paths no rule covers fall back to a PRIVATE rule with no permission
/// requirements (its `path` is empty).
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    by_specificity: Vec<RouteRule>,
    fallback: RouteRule,
}

impl RouteClassifier {
    pub fn new(table: RouteTable) -> Self {
        let mut by_specificity = table.rules;
        // Stable: equal lengths keep declaration order.
        by_specificity.sort_by(|a, b| b.path.len().cmp(&a.path.len()));

        Self {
            by_specificity,
            fallback: RouteRule::new(String::new(), Tier::Private),
        }
    }

    pub fn classify(&self, path: &str) -> &RouteRule {
        self.by_specificity
            .iter()
            .find(|rule| rule.covers(path))
            .unwrap_or(&self.fallback)
    }

    pub fn is_fallback(&self, rule: &RouteRule) -> bool {
        std::ptr::eq(rule, &self.fallback)
    }
}
