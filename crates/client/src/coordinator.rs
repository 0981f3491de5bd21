//! Single-retry session refresh around authenticated outbound calls.
//!
//! Rules:
//! - success and non-authorization failures pass through untouched
//! - the first authorization failure of a logical call triggers one refresh,
//!   then the call is replayed exactly once with the new credential
//! - a second authorization failure is surfaced as-is (no refresh loop)
//! - concurrent callers that fail with the same credential share one
//!   in-flight refresh; if it fails or times out they all see that failure

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tracing::{debug, info, warn};

use gatehouse_core::{AccessError, ErrorKind};

use crate::credential::{CredentialStore, SessionCredential};

/// Errors that may mean "the credential was not accepted" (HTTP 401).
pub trait AuthorizationFailure {
    fn is_authorization_failure(&self) -> bool;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("no session to refresh")]
    NoSession,

    #[error("refresh credential rejected: {0}")]
    Rejected(String),

    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh timed out after {0:?}")]
    TimedOut(Duration),
}

impl From<RefreshError> for AccessError {
    fn from(value: RefreshError) -> Self {
        AccessError::refresh_failed(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ExecuteError<E> {
    /// The wrapped call failed; returned unchanged.
    #[error("{0}")]
    Call(E),

    /// Terminal: the session could not be refreshed.
    #[error("session expired: {0}")]
    SessionExpired(RefreshError),
}

impl<E> ExecuteError<E> {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ExecuteError::SessionExpired(_))
    }

    /// Structured kind for notification UIs, when the failure is an access one.
    pub fn access_kind(&self) -> Option<ErrorKind> {
        match self {
            ExecuteError::SessionExpired(_) => Some(ErrorKind::RefreshFailed),
            ExecuteError::Call(_) => None,
        }
    }

    pub fn into_call_error(self) -> Option<E> {
        match self {
            ExecuteError::Call(err) => Some(err),
            ExecuteError::SessionExpired(_) => None,
        }
    }
}

/// Exchanges a refresh credential for a new session credential.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<SessionCredential, RefreshError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Upper bound for one refresh attempt; exceeding it counts as failure.
    pub timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl RefreshConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Per-logical-call retry flag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshState {
    pub retried: bool,
}

type RefreshOutcome = Result<SessionCredential, RefreshError>;

struct InFlight {
    /// Generation of the credential being replaced.
    generation: u64,
    outcome: Shared<BoxFuture<'static, RefreshOutcome>>,
}

/// Wraps authenticated calls with at most one coalesced session refresh.
///
/// Cheap to clone; clones share the credential store and in-flight refresh.
#[derive(Clone)]
pub struct SessionRefreshCoordinator {
    store: Arc<CredentialStore>,
    refresher: Arc<dyn SessionRefresher>,
    inflight: Arc<Mutex<Option<InFlight>>>,
    config: RefreshConfig,
}

impl SessionRefreshCoordinator {
    pub fn new(store: Arc<CredentialStore>, refresher: Arc<dyn SessionRefresher>) -> Self {
        Self::with_config(store, refresher, RefreshConfig::default())
    }

    pub fn with_config(
        store: Arc<CredentialStore>,
        refresher: Arc<dyn SessionRefresher>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            store,
            refresher,
            inflight: Arc::new(Mutex::new(None)),
            config,
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Run `call` with the ambient credential, refreshing once on an
    /// authorization failure.
    ///
    /// `call` is invoked at most twice and the refresher at most once per
    /// logical call.
    pub async fn execute<T, E, F, Fut>(&self, mut call: F) -> Result<T, ExecuteError<E>>
    where
        F: FnMut(SessionCredential) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: AuthorizationFailure,
    {
        let (credential, generation) = self.store.snapshot();
        let mut credential =
            credential.ok_or(ExecuteError::SessionExpired(RefreshError::NoSession))?;
        let mut state = RefreshState::default();

        loop {
            match call(credential).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_authorization_failure() => return Err(ExecuteError::Call(err)),
                Err(err) if state.retried => {
                    warn!("call rejected again after session refresh; giving up");
                    return Err(ExecuteError::Call(err));
                }
                Err(_) => {
                    state.retried = true;
                    credential = self
                        .refreshed_after(generation)
                        .await
                        .map_err(ExecuteError::SessionExpired)?;
                }
            }
        }
    }

    /// A credential newer than `generation`, refreshing if nobody has yet.
    async fn refreshed_after(&self, generation: u64) -> RefreshOutcome {
        let outcome = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());

            let (current, current_generation) = self.store.snapshot();
            if current_generation != generation {
                debug!(generation, current_generation, "credential already replaced");
                return current.ok_or(RefreshError::NoSession);
            }
            let current = current.ok_or(RefreshError::NoSession)?;

            match inflight.as_ref() {
                Some(flight) if flight.generation == generation => {
                    debug!(generation, "joining in-flight session refresh");
                    flight.outcome.clone()
                }
                _ => {
                    let refresh_token = current.refresh_token().to_string();
                    let outcome = self.start_refresh(generation, refresh_token);
                    *inflight = Some(InFlight {
                        generation,
                        outcome: outcome.clone(),
                    });
                    outcome
                }
            }
        };

        let result = outcome.await;

        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if inflight
            .as_ref()
            .is_some_and(|flight| flight.generation == generation)
        {
            *inflight = None;
        }

        result
    }

    fn start_refresh(
        &self,
        generation: u64,
        refresh_token: String,
    ) -> Shared<BoxFuture<'static, RefreshOutcome>> {
        let store = Arc::clone(&self.store);
        let refresher = Arc::clone(&self.refresher);
        let timeout = self.config.timeout;

        // Spawned so the refresh and its store update finish even when every
        // waiter is cancelled.
        let task = tokio::spawn(async move {
            debug!(generation, "refreshing session");
            let outcome = tokio::time::timeout(timeout, refresher.refresh(&refresh_token))
                .await
                .unwrap_or(Err(RefreshError::TimedOut(timeout)));

            match &outcome {
                Ok(credential) => {
                    store.replace_if_current(generation, credential.clone());
                    info!(generation, "session refreshed");
                }
                Err(err) => {
                    warn!(generation, error = %err, "session refresh failed");
                    if AccessError::from(err.clone()).kind().requires_logout() {
                        store.clear_if_current(generation);
                    }
                }
            }
            outcome
        });

        async move {
            task.await.unwrap_or_else(|err| {
                Err(RefreshError::Transport(format!("refresh task ended: {err}")))
            })
        }
        .boxed()
        .shared()
    }
}
