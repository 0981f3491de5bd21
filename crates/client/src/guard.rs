//! Post-render route guard.
//!
//! Two phases: [`ClientGuard::view`] computes what to show from the current
//! identity resolution (pure), and [`ClientGuard::apply`] performs the
//! redirect one scheduling turn later so it never happens mid-render.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use gatehouse_auth::{AccessDecisionEngine, Identity, RouteClassifier, SessionState};
use gatehouse_core::{AccessError, Decision, DenyReason};

/// Progress of identity resolution on the client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdentityResolution {
    /// Still waiting for the session to be resolved.
    #[default]
    Pending,
    Anonymous,
    Rejected(AccessError),
    Resolved(Identity),
}

impl IdentityResolution {
    fn session(&self) -> Option<SessionState> {
        match self {
            IdentityResolution::Pending => None,
            IdentityResolution::Anonymous => Some(SessionState::Anonymous),
            IdentityResolution::Rejected(err) => Some(SessionState::Rejected(err.clone())),
            IdentityResolution::Resolved(identity) => {
                Some(SessionState::Authenticated(identity.clone()))
            }
        }
    }
}

/// What the guarded page should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    /// Transitional placeholder while identity is unresolved.
    Placeholder,
    /// Render the guarded children.
    Render,
    /// Render nothing further; navigate to `target`.
    Redirect { target: String, clear_session: bool },
    /// Explicit access-denied view.
    Denied(DenyReason),
}

/// Effects the guard may perform on the hosting client.
pub trait Navigator: Send + Sync {
    /// Replace the current location (no history entry).
    fn replace(&self, target: &str);

    /// Drop stored session artifacts.
    fn clear_session(&self);
}

#[derive(Debug, Clone)]
pub struct ClientGuard {
    classifier: Arc<RouteClassifier>,
    engine: Arc<AccessDecisionEngine>,
}

impl ClientGuard {
    pub fn new(classifier: Arc<RouteClassifier>, engine: Arc<AccessDecisionEngine>) -> Self {
        Self { classifier, engine }
    }

    /// Phase one: decide what to show. Never performs effects.
    pub fn view(&self, path: &str, resolution: &IdentityResolution) -> GuardView {
        let Some(session) = resolution.session() else {
            return GuardView::Placeholder;
        };

        let rule = self.classifier.classify(path);
        let verdict = self.engine.evaluate(rule, &session, path);

        match verdict.decision {
            Decision::Allow => GuardView::Render,
            Decision::RedirectTo(target) => GuardView::Redirect {
                target,
                clear_session: verdict.clear_session,
            },
            Decision::Deny(reason) => GuardView::Denied(reason),
        }
    }

    /// Phase two: apply the view's effects on the next scheduling turn.
    pub async fn apply(&self, view: &GuardView, navigator: &dyn Navigator) {
        let GuardView::Redirect {
            target,
            clear_session,
        } = view
        else {
            return;
        };

        tokio::task::yield_now().await;

        if *clear_session {
            navigator.clear_session();
        }
        debug!(target = %target, "client guard redirect");
        navigator.replace(target);
    }

    /// Wait for identity to settle, then decide and apply.
    ///
    /// A closed identity channel while still pending counts as anonymous.
    pub async fn run(
        &self,
        path: &str,
        identity: &mut watch::Receiver<IdentityResolution>,
        navigator: &dyn Navigator,
    ) -> GuardView {
        let view = loop {
            let view = self.view(path, &identity.borrow_and_update());
            if view != GuardView::Placeholder {
                break view;
            }
            if identity.changed().await.is_err() {
                break self.view(path, &IdentityResolution::Anonymous);
            }
        };

        self.apply(&view, navigator).await;
        view
    }
}
