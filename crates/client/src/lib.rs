//! `gatehouse-client`: the client side of the gate.
//!
//! - `coordinator`: single-retry session refresh around outbound calls,
//!   with concurrent refreshes coalesced into one in-flight operation
//! - `credential`: the ambient session credential shared by all calls
//! - `guard`: post-render route guard (decide, then redirect next turn)
//! - `http`: reqwest-backed API client, refresher and identity resolver

pub mod coordinator;
pub mod credential;
pub mod guard;
pub mod http;

pub use coordinator::{
    AuthorizationFailure, ExecuteError, RefreshConfig, RefreshError, RefreshState,
    SessionRefreshCoordinator, SessionRefresher,
};
pub use credential::{CredentialStore, SessionCredential};
pub use guard::{ClientGuard, GuardView, IdentityResolution, Navigator};
pub use http::{ApiClient, ApiError, HttpIdentityResolver, HttpSessionRefresher};
