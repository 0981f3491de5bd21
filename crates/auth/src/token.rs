//! Session token verification (signature + claims, no network round-trip).

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};

use crate::claims::{SessionClaims, TokenError, validate_claims};

/// Verifies a raw session token and yields its claims.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError>;
}

/// HMAC-SHA256 signed tokens.
///
/// The time window is checked by [`validate_claims`] against the caller's
/// clock rather than by the JWT library, so `exp`/`iat` are not required.
pub struct Hs256TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256TokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl TokenVerifier for Hs256TokenVerifier {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gatehouse_core::{SubjectId, TenantId};
    use jsonwebtoken::{EncodingKey, Header, encode};

    use crate::Role;

    const SECRET: &str = "test-secret";

    fn mint(secret: &str, claims: &SessionClaims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(now: DateTime<Utc>, ttl: Duration) -> SessionClaims {
        SessionClaims {
            sub: SubjectId::new(),
            tenant_id: TenantId::new(),
            roles: vec![Role::new("member")],
            must_change_password: true,
            issued_at: now - Duration::seconds(1),
            expires_at: now + ttl,
        }
    }

    #[test]
    fn valid_token_yields_its_claims() {
        let now = Utc::now();
        let expected = claims(now, Duration::minutes(10));
        let token = mint(SECRET, &expected);

        let verified = Hs256TokenVerifier::new(SECRET).verify(&token, now).unwrap();
        assert_eq!(verified, expected);
    }

    #[test]
    fn wrong_secret_is_a_bad_signature() {
        let now = Utc::now();
        let token = mint("other-secret", &claims(now, Duration::minutes(10)));

        let err = Hs256TokenVerifier::new(SECRET).verify(&token, now).unwrap_err();
        assert_eq!(err, TokenError::BadSignature);
    }

    #[test]
    fn garbage_is_malformed() {
        let err = Hs256TokenVerifier::new(SECRET)
            .verify("not-a-token", Utc::now())
            .unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let now = Utc::now();
        let token = mint(SECRET, &claims(now, Duration::minutes(10)));

        let later = now + Duration::minutes(11);
        let err = Hs256TokenVerifier::new(SECRET).verify(&token, later).unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }
}
