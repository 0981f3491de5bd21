//! `gatehouse-core`: shared access-control vocabulary.
//!
//! This crate contains **pure** data types (no tokens, no HTTP, no IO). Both
//! enforcement points (the edge gatekeeper and the client guard) speak this
//! vocabulary so they cannot drift apart.

pub mod decision;
pub mod error;
pub mod id;
pub mod paths;
pub mod tier;

pub use decision::{Decision, DenyReason};
pub use error::{AccessError, ErrorKind, InvalidId};
pub use id::{SubjectId, TenantId};
pub use paths::{
    CALLBACK_PARAM, CHANGE_PASSWORD_PATH, DASHBOARD_PATH, FORBIDDEN_PATH, LOGIN_PATH,
    RedirectTargets,
};
pub use tier::Tier;
