//! Gatekeeper configuration.

use std::net::SocketAddr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use gatehouse_auth::{RolePolicy, RouteTable};
use gatehouse_core::RedirectTargets;

pub const DEV_JWT_SECRET: &str = "dev-secret";

/// Names of the cookies carrying the session artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieNames {
    pub session: String,
    pub refresh: String,
}

impl Default for CookieNames {
    fn default() -> Self {
        Self {
            session: "session".to_string(),
            refresh: "refresh_token".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatekeeperConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub cookies: CookieNames,
    /// Paths under this prefix get JSON errors instead of redirects.
    pub api_prefix: String,
    /// When set, identities are fetched from this endpoint with the session token.
    pub identity_endpoint: Option<String>,
    /// `None` uses the built-in table.
    pub route_table: Option<RouteTable>,
    pub redirect_targets: RedirectTargets,
    pub roles: RolePolicy,
}

impl GatekeeperConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: jwt_secret.into(),
            cookies: CookieNames::default(),
            api_prefix: "/api".to_string(),
            identity_endpoint: None,
            route_table: None,
            redirect_targets: RedirectTargets::default(),
            roles: RolePolicy::standard(),
        }
    }

    pub fn with_route_table(mut self, table: RouteTable) -> Self {
        self.route_table = Some(table);
        self
    }

    pub fn with_identity_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.identity_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_roles(mut self, roles: RolePolicy) -> Self {
        self.roles = roles;
        self
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let mut config = Self::new(jwt_secret);

        if let Some(bind) = env_opt("GATEHOUSE_BIND") {
            config.bind_addr = bind
                .parse()
                .with_context(|| format!("invalid GATEHOUSE_BIND address: {bind}"))?;
        }
        if let Some(name) = env_opt("SESSION_COOKIE") {
            config.cookies.session = name;
        }
        if let Some(name) = env_opt("REFRESH_COOKIE") {
            config.cookies.refresh = name;
        }
        if let Some(prefix) = env_opt("GATEHOUSE_API_PREFIX") {
            config.api_prefix = prefix;
        }
        config.identity_endpoint = env_opt("IDENTITY_ENDPOINT");

        if let Some(path) = env_opt("ROUTE_TABLE") {
            let document = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read route table {path}"))?;
            let table = RouteTable::from_json(&document)
                .with_context(|| format!("invalid route table {path}"))?;
            config.route_table = Some(table);
        }

        Ok(config)
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
