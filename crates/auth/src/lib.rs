//! `gatehouse-auth`: route classification, permission matching and the
//! access decision policy.
//!
//! This crate is intentionally decoupled from HTTP frameworks and storage:
//! the gatekeeper middleware and the client guard are thin adapters over it.

pub mod claims;
pub mod identity;
pub mod permissions;
pub mod policy;
pub mod roles;
pub mod routes;
pub mod token;

pub use claims::{SessionClaims, TokenError, validate_claims};
pub use identity::{
    AccountRecord, AccountStatus, ClaimsIdentityResolver, Identity, IdentityLookupError,
    IdentityResolver, InMemoryIdentityDirectory,
};
pub use permissions::{
    Permission, PermissionForm, PermissionSet, PermissionSyntaxError, matches, matches_all,
};
pub use policy::{AccessDecisionEngine, DecisionRule, SessionState, Verdict};
pub use roles::{Role, RolePolicy};
pub use routes::{RouteClassifier, RouteRule, RouteTable, RouteTableError};
pub use token::{Hs256TokenVerifier, TokenVerifier};
