//! Access error taxonomy.

use serde::Serialize;
use thiserror::Error;

use crate::decision::DenyReason;

/// Failure surfaced to callers of the access-control core.
///
/// Route classification, permission matching and policy evaluation are total
/// and never produce these; they come from token handling and from the
/// session refresh path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Malformed token or bad signature. Treated as anonymous.
    #[error("invalid session token: {0}")]
    InvalidToken(String),

    /// Token is well-formed but past its expiry.
    #[error("session token has expired")]
    ExpiredToken,

    /// The actor is authenticated but banned or pending.
    #[error("account not active")]
    AccountInactive,

    /// Routed as a redirect to the forbidden page, never thrown at the UI.
    #[error("forbidden: missing permission '{0}'")]
    PermissionDenied(String),

    /// Terminal: the session could not be refreshed; force a full logout.
    #[error("session expired: {0}")]
    RefreshFailed(String),
}

impl AccessError {
    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    pub fn refresh_failed(msg: impl Into<String>) -> Self {
        Self::RefreshFailed(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AccessError::InvalidToken(_) => ErrorKind::InvalidToken,
            AccessError::ExpiredToken => ErrorKind::ExpiredToken,
            AccessError::AccountInactive => ErrorKind::AccountInactive,
            AccessError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            AccessError::RefreshFailed(_) => ErrorKind::RefreshFailed,
        }
    }
}

impl From<DenyReason> for AccessError {
    fn from(value: DenyReason) -> Self {
        match value {
            DenyReason::AccountNotActive => AccessError::AccountInactive,
        }
    }
}

/// Structured error kind consumed by notification UIs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidToken,
    ExpiredToken,
    AccountInactive,
    PermissionDenied,
    RefreshFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidToken => "invalid_token",
            ErrorKind::ExpiredToken => "expired_token",
            ErrorKind::AccountInactive => "account_inactive",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::RefreshFailed => "refresh_failed",
        }
    }

    /// The UI must drop all client state instead of retrying.
    pub fn requires_logout(&self) -> bool {
        matches!(self, ErrorKind::RefreshFailed)
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identifier failed to parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid identifier: {0}")]
pub struct InvalidId(pub String);
