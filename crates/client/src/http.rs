//! reqwest-backed outbound calls.

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatehouse_auth::{
    AccountStatus, Identity, IdentityLookupError, IdentityResolver, PermissionSet, SessionClaims,
};

use crate::coordinator::{
    AuthorizationFailure, ExecuteError, RefreshError, SessionRefreshCoordinator, SessionRefresher,
};
use crate::credential::SessionCredential;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl AuthorizationFailure for ApiError {
    fn is_authorization_failure(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED.as_u16())
    }
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Authenticated JSON client; every call goes through the refresh coordinator.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    coordinator: SessionRefreshCoordinator,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, coordinator: SessionRefreshCoordinator) -> Self {
        Self::with_http(reqwest::Client::new(), base_url, coordinator)
    }

    pub fn with_http(
        http: reqwest::Client,
        base_url: impl Into<String>,
        coordinator: SessionRefreshCoordinator,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &SessionRefreshCoordinator {
        &self.coordinator
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ExecuteError<ApiError>> {
        let url = format!("{}{}", self.base_url, path);
        self.coordinator
            .execute(|credential| {
                send_json(self.http.get(&url).bearer_auth(credential.access_token()))
            })
            .await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ExecuteError<ApiError>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        self.coordinator
            .execute(|credential| {
                send_json(
                    self.http
                        .post(&url)
                        .bearer_auth(credential.access_token())
                        .json(body),
                )
            })
            .await
    }
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    /// Absent when the server does not rotate refresh tokens.
    refresh_token: Option<String>,
}

/// Exchanges the refresh credential at a refresh endpoint.
#[derive(Debug, Clone)]
pub struct HttpSessionRefresher {
    http: reqwest::Client,
    refresh_url: String,
}

impl HttpSessionRefresher {
    pub fn new(refresh_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            refresh_url: refresh_url.into(),
        }
    }
}

#[async_trait]
impl SessionRefresher for HttpSessionRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<SessionCredential, RefreshError> {
        let request = self
            .http
            .post(&self.refresh_url)
            .json(&RefreshRequest { refresh_token });

        let response: RefreshResponse = send_json(request).await.map_err(|e| match e.status() {
            Some(401) | Some(403) => RefreshError::Rejected(e.to_string()),
            _ => RefreshError::Transport(e.to_string()),
        })?;

        let refresh_token = response
            .refresh_token
            .unwrap_or_else(|| refresh_token.to_string());
        Ok(SessionCredential::new(response.access_token, refresh_token))
    }
}

/// Identity document served by the identity endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityDocument {
    #[serde(default)]
    pub permissions: PermissionSet,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(rename = "mustChangePassword", alias = "must_change_password", default)]
    pub must_change_password: Option<bool>,
}

/// Resolves identities by calling the identity endpoint with the session token.
#[derive(Debug, Clone)]
pub struct HttpIdentityResolver {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpIdentityResolver {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    async fn resolve(
        &self,
        claims: &SessionClaims,
        token: &str,
    ) -> Result<Identity, IdentityLookupError> {
        let request = self.http.get(&self.endpoint).bearer_auth(token);
        let document: IdentityDocument = send_json(request).await.map_err(|e| match e.status() {
            Some(404) => IdentityLookupError::UnknownSubject(claims.sub),
            _ => IdentityLookupError::Unavailable(e.to_string()),
        })?;

        Ok(Identity {
            subject: claims.sub,
            tenant_id: claims.tenant_id,
            permissions: document.permissions,
            must_change_password: document
                .must_change_password
                .unwrap_or(claims.must_change_password),
            status: document.status,
        })
    }
}
