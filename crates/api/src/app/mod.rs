//! HTTP application wiring (Axum router + gatekeeper state).
//!
//! - `routes/`: handlers for the demo surface
//! - `dto.rs`: request DTOs
//! - `route_table.rs`: the built-in tier map
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};

use gatehouse_auth::{
    AccessDecisionEngine, ClaimsIdentityResolver, Hs256TokenVerifier, IdentityResolver,
    RouteClassifier,
};
use gatehouse_client::HttpIdentityResolver;

use crate::config::GatekeeperConfig;
use crate::middleware::{self, GateState};

pub mod dto;
pub mod errors;
pub mod route_table;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: GatekeeperConfig) -> anyhow::Result<Router> {
    let table = match config.route_table {
        Some(table) => table,
        None => route_table::default_table()?,
    };

    let identities: Arc<dyn IdentityResolver> = match config.identity_endpoint {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "resolving identities over http");
            Arc::new(HttpIdentityResolver::new(endpoint))
        }
        None => Arc::new(ClaimsIdentityResolver::new(config.roles)),
    };

    let gate = GateState {
        verifier: Arc::new(Hs256TokenVerifier::new(config.jwt_secret.as_bytes())),
        identities,
        classifier: Arc::new(RouteClassifier::new(table)),
        engine: Arc::new(AccessDecisionEngine::new(config.redirect_targets)),
        cookies: config.cookies,
        api_prefix: config.api_prefix,
    };

    Ok(routes::router()
        .layer(Extension(gate.clone()))
        .layer(axum::middleware::from_fn_with_state(gate, middleware::gatekeeper)))
}
