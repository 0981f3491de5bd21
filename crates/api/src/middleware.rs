use std::sync::Arc;

use axum::{
    extract::State,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tracing::warn;

use gatehouse_auth::permissions::missing;
use gatehouse_auth::{
    AccessDecisionEngine, DecisionRule, IdentityLookupError, IdentityResolver, RouteClassifier,
    RouteRule, SessionState, TokenVerifier, Verdict,
};
use gatehouse_core::{AccessError, Decision, ErrorKind, Tier};

use crate::app::errors::json_error;
use crate::config::CookieNames;
use crate::context::{PrincipalContext, TenantContext};

#[derive(Clone)]
pub struct GateState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub identities: Arc<dyn IdentityResolver>,
    pub classifier: Arc<RouteClassifier>,
    pub engine: Arc<AccessDecisionEngine>,
    pub cookies: CookieNames,
    pub api_prefix: String,
}

impl GateState {
    pub fn is_api_path(&self, path: &str) -> bool {
        path.strip_prefix(self.api_prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Verify the presented session token and resolve its identity.
    ///
    /// Returns a ready response only when the identity source is down.
    pub async fn resolve_session(&self, headers: &HeaderMap) -> Result<SessionState, Response> {
        let Some(token) = session_token(headers, &self.cookies.session) else {
            return Ok(SessionState::Anonymous);
        };

        let claims = match self.verifier.verify(token, Utc::now()) {
            Ok(claims) => claims,
            Err(err) => return Ok(SessionState::Rejected(err.into())),
        };

        match self.identities.resolve(&claims, token).await {
            Ok(identity) => Ok(SessionState::Authenticated(identity)),
            Err(IdentityLookupError::UnknownSubject(subject)) => Ok(SessionState::Rejected(
                AccessError::invalid_token(format!("unknown subject {subject}")),
            )),
            Err(IdentityLookupError::Unavailable(msg)) => {
                warn!(error = %msg, "identity source unavailable");
                Err(json_error(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "identity_unavailable",
                    "identity source unavailable",
                ))
            }
        }
    }
}

/// Pre-request gate: classify, resolve the session, decide, apply.
pub async fn gatekeeper(
    State(state): State<GateState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let rule = state.classifier.classify(&path);

    // Public routes never need an identity.
    let session = if rule.tier == Tier::Public {
        SessionState::Anonymous
    } else {
        let headers = req.headers().clone();
        match state.resolve_session(&headers).await {
            Ok(session) => session,
            Err(response) => return response,
        }
    };

    let verdict = state.engine.evaluate(rule, &session, &path);

    if let (Some(err), true) = (session.rejection(), verdict.clear_session) {
        warn!(path = %path, kind = %err.kind(), "rejected session token on private route");
    }

    if state.is_api_path(&path) && !verdict.decision.is_allow() {
        return api_rejection(&state.cookies, rule, &session, &verdict);
    }

    match verdict.decision {
        Decision::Allow => {
            if let SessionState::Authenticated(identity) = session {
                req.extensions_mut()
                    .insert(TenantContext::new(identity.tenant_id));
                req.extensions_mut().insert(PrincipalContext::new(identity));
            }
            next.run(req).await
        }
        Decision::RedirectTo(target) => {
            let mut response = Redirect::temporary(&target).into_response();
            if verdict.clear_session {
                clear_session_cookies(&mut response, &state.cookies);
            }
            response
        }
        Decision::Deny(reason) => access_error(StatusCode::FORBIDDEN, &AccessError::from(reason)),
    }
}

/// JSON failure for API callers, which must never be handed an HTML redirect.
fn api_rejection(
    cookies: &CookieNames,
    rule: &RouteRule,
    session: &SessionState,
    verdict: &Verdict,
) -> Response {
    match verdict.rule {
        DecisionRule::PrivateAnonymous => match session.rejection() {
            Some(err) => {
                let mut response = access_error(StatusCode::UNAUTHORIZED, err);
                // An expired token stays so the client can refresh it.
                if verdict.clear_session && err.kind() != ErrorKind::ExpiredToken {
                    clear_session_cookies(&mut response, cookies);
                }
                response
            }
            None => json_error(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "authentication required",
            ),
        },
        DecisionRule::PrivateInactive => {
            access_error(StatusCode::FORBIDDEN, &AccessError::AccountInactive)
        }
        DecisionRule::PasswordChangeRequired => json_error(
            StatusCode::FORBIDDEN,
            "password_change_required",
            "password change required",
        ),
        DecisionRule::MissingPermissions => {
            let absent: Vec<&str> = session
                .identity()
                .map(|identity| missing(&identity.permissions, &rule.required_permissions))
                .unwrap_or_default()
                .into_iter()
                .map(|p| p.as_str())
                .collect();
            access_error(
                StatusCode::FORBIDDEN,
                &AccessError::PermissionDenied(absent.join(", ")),
            )
        }
        DecisionRule::GuestAuthenticated => json_error(
            StatusCode::FORBIDDEN,
            "guest_only",
            "only available to signed-out visitors",
        ),
        _ => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
    }
}

fn access_error(status: StatusCode, err: &AccessError) -> Response {
    json_error(status, err.kind().as_str(), err.to_string())
}

fn clear_session_cookies(response: &mut Response, cookies: &CookieNames) {
    for name in [&cookies.session, &cookies.refresh] {
        let expired = format!("{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&expired) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
}

/// Session cookie first, then an `Authorization: Bearer` header.
fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    cookie(headers, cookie_name).or_else(|| extract_bearer(headers))
}

fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
