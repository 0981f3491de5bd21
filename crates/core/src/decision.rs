//! Outcome of a single policy evaluation.

use serde::Serialize;

/// What should happen to a request right now.
///
/// A `Decision` is derived, never stored: it is recomputed on every
/// evaluation because both the identity and the route table can change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    RedirectTo(String),
    Deny(DenyReason),
}

impl Decision {
    pub fn redirect(target: impl Into<String>) -> Self {
        Self::RedirectTo(target.into())
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Decision::RedirectTo(target) => Some(target),
            _ => None,
        }
    }
}

/// Why an authenticated actor is refused outright (no redirect).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    AccountNotActive,
}

impl core::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DenyReason::AccountNotActive => f.write_str("account not active"),
        }
    }
}
