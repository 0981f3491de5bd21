use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post},
};
use chrono::Utc;
use serde_json::{Value, json};

use gatehouse_auth::{AccountStatus, IdentityLookupError, IdentityResolver, Role, SessionClaims};
use gatehouse_client::{
    ApiClient, ApiError, CredentialStore, ExecuteError, HttpIdentityResolver,
    HttpSessionRefresher, RefreshError, SessionCredential, SessionRefreshCoordinator,
};
use gatehouse_core::{SubjectId, TenantId};

#[derive(Clone, Default)]
struct Counters {
    refreshes: Arc<AtomicUsize>,
    item_calls: Arc<AtomicUsize>,
}

struct TestServer {
    base_url: String,
    counters: Counters,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let counters = Counters::default();
        let app = Router::new()
            .route("/api/items", get(items))
            .route("/api/broken", get(broken))
            .route("/auth/refresh", post(refresh))
            .route("/identity", get(identity))
            .with_state(counters.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            counters,
            handle,
        }
    }

    fn client(&self, refresh_token: &str) -> ApiClient {
        let store = Arc::new(CredentialStore::new(SessionCredential::new("stale", refresh_token)));
        let refresh_url = format!("{}/auth/refresh", self.base_url);
        let refresher = Arc::new(HttpSessionRefresher::new(refresh_url));
        ApiClient::new(self.base_url.clone(), SessionRefreshCoordinator::new(store, refresher))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn items(
    State(counters): State<Counters>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    counters.item_calls.fetch_add(1, Ordering::SeqCst);
    match bearer(&headers) {
        Some("fresh") => Ok(Json(json!({ "items": [1, 2, 3] }))),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn refresh(
    State(counters): State<Counters>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    counters.refreshes.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;

    if body["refresh_token"] == "refresh-1" {
        Ok(Json(json!({ "access_token": "fresh", "refresh_token": "refresh-2" })))
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

async fn identity(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    match bearer(&headers) {
        Some("known") => Ok(Json(json!({
            "permissions": ["roles:*", "tasks:view"],
            "status": "banned",
        }))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

fn claims() -> SessionClaims {
    let now = Utc::now();
    SessionClaims {
        sub: SubjectId::new(),
        tenant_id: TenantId::new(),
        roles: vec![Role::new("member")],
        must_change_password: true,
        issued_at: now,
        expires_at: now + chrono::Duration::minutes(10),
    }
}

#[tokio::test]
async fn concurrent_unauthorized_calls_refresh_once() {
    let srv = TestServer::spawn().await;
    let client = srv.client("refresh-1");

    let (a, b) = tokio::join!(
        client.get_json::<Value>("/api/items"),
        client.get_json::<Value>("/api/items"),
    );

    assert_eq!(a.unwrap()["items"], json!([1, 2, 3]));
    assert_eq!(b.unwrap()["items"], json!([1, 2, 3]));
    assert_eq!(srv.counters.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(srv.counters.item_calls.load(Ordering::SeqCst), 4);

    let credential = client.coordinator().store().current().unwrap();
    assert_eq!(credential.access_token(), "fresh");
    assert_eq!(credential.refresh_token(), "refresh-2");
}

#[tokio::test]
async fn revoked_refresh_token_expires_the_session() {
    let srv = TestServer::spawn().await;
    let client = srv.client("revoked");

    let err = client.get_json::<Value>("/api/items").await.unwrap_err();

    assert!(matches!(err, ExecuteError::SessionExpired(RefreshError::Rejected(_))));
    assert_eq!(srv.counters.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(srv.counters.item_calls.load(Ordering::SeqCst), 1);
    assert!(client.coordinator().store().current().is_none());
}

#[tokio::test]
async fn server_errors_pass_through_without_refresh() {
    let srv = TestServer::spawn().await;
    let client = srv.client("refresh-1");

    let err = client.get_json::<Value>("/api/broken").await.unwrap_err();

    match err {
        ExecuteError::Call(ApiError::Status { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected a pass-through status error, got {other:?}"),
    }
    assert_eq!(srv.counters.refreshes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn identity_endpoint_supplies_permissions_and_status() {
    let srv = TestServer::spawn().await;
    let resolver = HttpIdentityResolver::new(format!("{}/identity", srv.base_url));
    let claims = claims();

    let identity = resolver.resolve(&claims, "known").await.unwrap();
    assert_eq!(identity.subject, claims.sub);
    assert_eq!(identity.status, AccountStatus::Banned);
    assert!(identity.permissions.contains("roles:*"));
    // Not in the document, so the claim decides.
    assert!(identity.must_change_password);

    let err = resolver.resolve(&claims, "unknown").await.unwrap_err();
    assert_eq!(err, IdentityLookupError::UnknownSubject(claims.sub));
}
