use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatehouse_core::{AccessError, SubjectId, TenantId};

use crate::Role;

/// Session token claims (transport-agnostic).
///
/// This is the minimal set of claims the gate expects once a token has been
/// decoded and its signature verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject the token was issued to.
    pub sub: SubjectId,

    /// Tenant context for the session.
    pub tenant_id: TenantId,

    /// Roles granted within the tenant context.
    #[serde(default)]
    pub roles: Vec<Role>,

    /// Forces the actor through the change-password page before anything else.
    #[serde(rename = "mustChangePassword", alias = "must_change_password", default)]
    pub must_change_password: bool,

    pub issued_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

impl From<TokenError> for AccessError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Expired => AccessError::ExpiredToken,
            other => AccessError::invalid_token(other.to_string()),
        }
    }
}

/// Deterministically validate session claims against `now`.
///
/// Signature verification happens before this, in a [`crate::TokenVerifier`].
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenError::Expired);
    }
    Ok(())
}
