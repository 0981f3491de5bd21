//! Permission tokens and the wildcard matcher.
//!
//! Policy authors may write exactly three forms:
//!
//! - `"*"`: global wildcard, satisfies every requirement
//! - `"scope:*"`: every action within `scope`
//! - `"scope:action"`: one action
//!
//! There is no nesting and no negation.

use std::borrow::{Borrow, Cow};
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GLOBAL_WILDCARD: &str = "*";
const SEPARATOR: char = ':';

/// Permission identifier, e.g. `"roles:view"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

/// Structural reading of a permission token.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PermissionForm<'a> {
    Global,
    Scope(&'a str),
    Action { scope: &'a str, action: &'a str },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid permission '{token}': {reason}")]
pub struct PermissionSyntaxError {
    pub token: String,
    pub reason: &'static str,
}

impl Permission {
    /// Wrap a token without validating it.
    ///
    /// Held permissions coming from identity sources are matched as opaque
    /// strings; use [`Permission::parse`] for tokens written by policy authors.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Parse a token, accepting only the three documented forms.
    pub fn parse(name: impl Into<Cow<'static, str>>) -> Result<Self, PermissionSyntaxError> {
        let permission = Self(name.into());
        permission.form()?;
        Ok(permission)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == GLOBAL_WILDCARD
    }

    /// Scope named by a `scope:*` token.
    pub fn wildcard_scope(&self) -> Option<&str> {
        match self.form() {
            Ok(PermissionForm::Scope(scope)) => Some(scope),
            _ => None,
        }
    }

    pub fn form(&self) -> Result<PermissionForm<'_>, PermissionSyntaxError> {
        let token = self.as_str();
        let invalid = |reason| PermissionSyntaxError {
            token: token.to_string(),
            reason,
        };

        if token == GLOBAL_WILDCARD {
            return Ok(PermissionForm::Global);
        }
        if token.chars().any(char::is_whitespace) {
            return Err(invalid("whitespace is not allowed"));
        }

        let (scope, action) = token
            .split_once(SEPARATOR)
            .ok_or_else(|| invalid("expected 'scope:action', 'scope:*' or '*'"))?;

        if scope.is_empty() {
            return Err(invalid("scope is empty"));
        }
        if scope.contains('*') {
            return Err(invalid("wildcards are only allowed as the whole action"));
        }
        if action.is_empty() {
            return Err(invalid("action is empty"));
        }
        if action.contains(SEPARATOR) {
            return Err(invalid("permissions cannot be nested"));
        }
        if action == GLOBAL_WILDCARD {
            return Ok(PermissionForm::Scope(scope));
        }
        if action.contains('*') {
            return Err(invalid("wildcards are only allowed as the whole action"));
        }

        Ok(PermissionForm::Action { scope, action })
    }

    /// Does this single held grant satisfy `required`?
    ///
    /// A scope wildcard only matches when the literal separator follows the
    /// scope: `users:*` does not grant `usersextra:view`.
    pub fn grants(&self, required: &str) -> bool {
        if self.is_wildcard() || self.as_str() == required {
            return true;
        }
        self.wildcard_scope().is_some_and(|scope| {
            required
                .strip_prefix(scope)
                .is_some_and(|rest| rest.starts_with(SEPARATOR))
        })
    }
}

impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Permission {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permissions held by an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(HashSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, permission: impl Into<Permission>) -> bool {
        self.0.insert(permission.into())
    }

    pub fn extend<I>(&mut self, permissions: I)
    where
        I: IntoIterator,
        I::Item: Into<Permission>,
    {
        self.0.extend(permissions.into_iter().map(Into::into));
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    /// The held grant that satisfies `required`, preferring exact over
    /// wildcard matches.
    pub fn granting(&self, required: &str) -> Option<&Permission> {
        if let Some(exact) = self.0.get(required) {
            return Some(exact);
        }
        if let Some(global) = self.0.get(GLOBAL_WILDCARD) {
            return Some(global);
        }
        self.0.iter().find(|held| held.grants(required))
    }

    /// Sorted tokens, for logs and explanations.
    pub fn sorted(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = self.0.iter().map(Permission::as_str).collect();
        tokens.sort_unstable();
        tokens
    }
}

impl<P: Into<Permission>> FromIterator<P> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Does `held` satisfy `required`?
pub fn matches(held: &PermissionSet, required: &str) -> bool {
    held.granting(required).is_some()
}

/// Does `held` satisfy every entry of `required`? Vacuously true when
/// `required` is empty.
pub fn matches_all<'a, I>(held: &PermissionSet, required: I) -> bool
where
    I: IntoIterator<Item = &'a Permission>,
{
    required
        .into_iter()
        .all(|permission| matches(held, permission.as_str()))
}

/// Required permissions `held` does not satisfy.
pub fn missing<'a>(held: &PermissionSet, required: &'a [Permission]) -> Vec<&'a Permission> {
    required
        .iter()
        .filter(|permission| !matches(held, permission.as_str()))
        .collect()
}
