//! Access decision policy.
//!
//! One pure engine consumed by both enforcement points: the pre-request
//! gatekeeper and the post-render client guard. Given the same route rule,
//! session and path they reach the same [`Decision`].

use serde::Serialize;
use tracing::debug;

use gatehouse_core::{AccessError, Decision, DenyReason, RedirectTargets, Tier};

use crate::identity::Identity;
use crate::permissions::{matches_all, missing};
use crate::routes::RouteRule;

/// The row of the decision table that produced a [`Decision`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    PublicRoute,
    GuestAnonymous,
    GuestLoginDuringPasswordChange,
    GuestAuthenticated,
    PrivateAnonymous,
    PrivateInactive,
    PasswordChangePage,
    PasswordChangeRequired,
    PasswordChangeNotRequired,
    MissingPermissions,
    PrivateGranted,
}

/// What the enforcement point knows about the session presenting a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No session token was presented.
    Anonymous,
    /// A token was presented but failed verification.
    Rejected(AccessError),
    Authenticated(Identity),
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<&AccessError> {
        match self {
            SessionState::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

/// A decision plus the context an adapter needs to apply it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    pub rule: DecisionRule,
    /// Stored session artifacts must be dropped before redirecting, so a
    /// stale token is not presented again.
    pub clear_session: bool,
}

/// The access policy state machine.
///
/// Holds only configuration; every call is independent and repeatable.
#[derive(Debug, Clone, Default)]
pub struct AccessDecisionEngine {
    targets: RedirectTargets,
}

impl AccessDecisionEngine {
    pub fn new(targets: RedirectTargets) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &RedirectTargets {
        &self.targets
    }

    pub fn decide(&self, rule: &RouteRule, identity: Option<&Identity>, path: &str) -> Decision {
        self.explain(rule, identity, path).0
    }

    /// Evaluate the decision table; first matching row wins.
    ///
    /// Tier checks dominate identity checks, and the forced password change
    /// dominates permission checks.
    pub fn explain(
        &self,
        rule: &RouteRule,
        identity: Option<&Identity>,
        path: &str,
    ) -> (Decision, DecisionRule) {
        let t = &self.targets;

        match (rule.tier, identity) {
            (Tier::Public, _) => (Decision::Allow, DecisionRule::PublicRoute),

            (Tier::GuestOnly, None) => (Decision::Allow, DecisionRule::GuestAnonymous),
            (Tier::GuestOnly, Some(id)) if id.must_change_password && path == t.login => {
                (Decision::Allow, DecisionRule::GuestLoginDuringPasswordChange)
            }
            (Tier::GuestOnly, Some(_)) => (
                Decision::redirect(t.dashboard.as_str()),
                DecisionRule::GuestAuthenticated,
            ),

            (Tier::Private, None) => (
                Decision::redirect(t.login_with_callback(path)),
                DecisionRule::PrivateAnonymous,
            ),
            (Tier::Private, Some(id)) if !id.is_active() => (
                Decision::Deny(DenyReason::AccountNotActive),
                DecisionRule::PrivateInactive,
            ),
            (Tier::Private, Some(id)) if id.must_change_password => {
                if path == t.change_password {
                    (Decision::Allow, DecisionRule::PasswordChangePage)
                } else {
                    (
                        Decision::redirect(t.change_password.as_str()),
                        DecisionRule::PasswordChangeRequired,
                    )
                }
            }
            (Tier::Private, Some(_)) if path == t.change_password => (
                Decision::redirect(t.dashboard.as_str()),
                DecisionRule::PasswordChangeNotRequired,
            ),
            (Tier::Private, Some(id))
                if !matches_all(&id.permissions, &rule.required_permissions) =>
            {
                (
                    Decision::redirect(t.forbidden.as_str()),
                    DecisionRule::MissingPermissions,
                )
            }
            (Tier::Private, Some(_)) => (Decision::Allow, DecisionRule::PrivateGranted),
        }
    }

    /// Decide for a session and report how the decision must be applied.
    ///
    /// A rejected token counts as anonymous; on PRIVATE routes it also asks
    /// the adapter to clear the stored session before redirecting to login.
    pub fn evaluate(&self, rule: &RouteRule, session: &SessionState, path: &str) -> Verdict {
        let (decision, decision_rule) = self.explain(rule, session.identity(), path);
        let clear_session =
            rule.tier == Tier::Private && matches!(session, SessionState::Rejected(_));

        if decision_rule == DecisionRule::MissingPermissions {
            if let Some(identity) = session.identity() {
                let absent: Vec<&str> = missing(&identity.permissions, &rule.required_permissions)
                    .into_iter()
                    .map(|p| p.as_str())
                    .collect();
                debug!(
                    path,
                    subject = %identity.subject,
                    missing = ?absent,
                    held = ?identity.permissions.sorted(),
                    "permission check failed"
                );
            }
        }

        debug!(
            path,
            tier = %rule.tier,
            rule = ?decision_rule,
            clear_session,
            "access decision"
        );

        Verdict {
            decision,
            rule: decision_rule,
            clear_session,
        }
    }

    /// Where a successful login lands.
    ///
    /// A pending password change always wins; otherwise the callback is
    /// honoured when it is a safe same-site path, else the dashboard.
    pub fn post_login_target(&self, identity: &Identity, callback: Option<&str>) -> String {
        let t = &self.targets;
        if identity.must_change_password {
            return t.change_password.clone();
        }
        match callback {
            Some(path) if self.is_safe_callback(path) => path.to_string(),
            _ => t.dashboard.clone(),
        }
    }

    fn is_safe_callback(&self, path: &str) -> bool {
        let on_login = path
            .strip_prefix(self.targets.login.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('?') || rest.starts_with('/'));

        path.starts_with('/')
            && !path.starts_with("//")
            && !path.contains('\\')
            && !path.chars().any(char::is_control)
            && !on_login
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::{
        CHANGE_PASSWORD_PATH, DASHBOARD_PATH, FORBIDDEN_PATH, LOGIN_PATH, SubjectId, TenantId,
    };

    use crate::identity::AccountStatus;

    fn engine() -> AccessDecisionEngine {
        AccessDecisionEngine::default()
    }

    fn member(perms: &[&'static str]) -> Identity {
        Identity::new(SubjectId::new(), TenantId::new()).with_permissions(perms.iter().copied())
    }

    #[test]
    fn public_route_allows_anyone() {
        let rule = RouteRule::public("/about");
        assert_eq!(engine().decide(&rule, None, "/about"), Decision::Allow);

        let banned = member(&[]).with_status(AccountStatus::Banned);
        assert_eq!(engine().decide(&rule, Some(&banned), "/about"), Decision::Allow);
    }

    #[test]
    fn anonymous_private_request_redirects_to_login_with_callback() {
        let rule = RouteRule::private("/dashboard");
        assert_eq!(
            engine().decide(&rule, None, "/dashboard"),
            Decision::redirect("/login?callbackUrl=%2Fdashboard")
        );
    }

    #[test]
    fn guest_only_routes() {
        let rule = RouteRule::guest_only(LOGIN_PATH);
        assert_eq!(engine().decide(&rule, None, LOGIN_PATH), Decision::Allow);

        let signed_in = member(&[]);
        assert_eq!(
            engine().decide(&rule, Some(&signed_in), LOGIN_PATH),
            Decision::redirect(DASHBOARD_PATH)
        );

        let must_change = member(&[]).requiring_password_change();
        assert_eq!(engine().decide(&rule, Some(&must_change), LOGIN_PATH), Decision::Allow);

        // The exception is for the login page only.
        let register = RouteRule::guest_only("/register");
        assert_eq!(
            engine().decide(&register, Some(&must_change), "/register"),
            Decision::redirect(DASHBOARD_PATH)
        );
    }

    #[test]
    fn inactive_accounts_are_denied() {
        let rule = RouteRule::private("/dashboard");
        for status in [AccountStatus::Banned, AccountStatus::Pending] {
            let identity = member(&["*"]).with_status(status).requiring_password_change();
            assert_eq!(
                engine().decide(&rule, Some(&identity), "/dashboard"),
                Decision::Deny(DenyReason::AccountNotActive)
            );
        }
    }

    #[test]
    fn forced_password_change_dominates_permissions() {
        let rule = RouteRule::private("/roles").requiring(["roles:view"]);
        let identity = member(&[]).requiring_password_change();

        assert_eq!(
            engine().decide(&rule, Some(&identity), "/roles"),
            Decision::redirect(CHANGE_PASSWORD_PATH)
        );

        let page = RouteRule::private(CHANGE_PASSWORD_PATH);
        assert_eq!(
            engine().decide(&page, Some(&identity), CHANGE_PASSWORD_PATH),
            Decision::Allow
        );
    }

    #[test]
    fn change_password_page_is_off_limits_when_not_required() {
        let page = RouteRule::private(CHANGE_PASSWORD_PATH);
        assert_eq!(
            engine().decide(&page, Some(&member(&[])), CHANGE_PASSWORD_PATH),
            Decision::redirect(DASHBOARD_PATH)
        );
    }

    #[test]
    fn permissions_gate_private_routes() {
        let rule = RouteRule::private("/roles").requiring(["roles:view"]);

        let scoped = member(&["roles:*"]);
        assert_eq!(engine().decide(&rule, Some(&scoped), "/roles"), Decision::Allow);

        let unrelated = member(&["rolesextra:*", "tasks:view"]);
        assert_eq!(
            engine().decide(&rule, Some(&unrelated), "/roles"),
            Decision::redirect(FORBIDDEN_PATH)
        );

        let plain = RouteRule::private("/dashboard");
        assert_eq!(engine().decide(&plain, Some(&member(&[])), "/dashboard"), Decision::Allow);
    }

    #[test]
    fn decisions_are_repeatable() {
        let rule = RouteRule::private("/roles").requiring(["roles:view"]);
        let identity = member(&["tasks:view"]);
        let engine = engine();

        let first = engine.explain(&rule, Some(&identity), "/roles");
        let second = engine.explain(&rule, Some(&identity), "/roles");
        assert_eq!(first, second);
        assert_eq!(first.1, DecisionRule::MissingPermissions);
    }

    #[test]
    fn rejected_tokens_clear_the_session_on_private_routes_only() {
        let engine = engine();
        let rejected = SessionState::Rejected(AccessError::ExpiredToken);

        let private = RouteRule::private("/dashboard");
        let verdict = engine.evaluate(&private, &rejected, "/dashboard");
        assert_eq!(verdict.decision, Decision::redirect("/login?callbackUrl=%2Fdashboard"));
        assert!(verdict.clear_session);

        let guest = RouteRule::guest_only(LOGIN_PATH);
        let verdict = engine.evaluate(&guest, &rejected, LOGIN_PATH);
        assert_eq!(verdict.decision, Decision::Allow);
        assert!(!verdict.clear_session);

        let anonymous = engine.evaluate(&private, &SessionState::Anonymous, "/dashboard");
        assert!(!anonymous.clear_session);
    }

    #[test]
    fn login_lands_on_a_safe_callback() {
        let engine = engine();
        let identity = member(&[]);

        assert_eq!(engine.post_login_target(&identity, Some("/roles/7")), "/roles/7");
        assert_eq!(engine.post_login_target(&identity, None), DASHBOARD_PATH);
        let unsafe_targets = [
            "https://evil.example",
            "//evil.example",
            "/\\evil",
            "/login",
            "/login?callbackUrl=%2Fx",
        ];
        for unsafe_target in unsafe_targets {
            assert_eq!(
                engine.post_login_target(&identity, Some(unsafe_target)),
                DASHBOARD_PATH,
                "{unsafe_target}"
            );
        }

        let must_change = member(&[]).requiring_password_change();
        assert_eq!(
            engine.post_login_target(&must_change, Some("/roles")),
            CHANGE_PASSWORD_PATH
        );
    }
}
