use axum::{
    Json,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::app::dto::CallbackQuery;
use crate::app::errors::json_error;
use crate::context::{PrincipalContext, TenantContext};
use crate::middleware::GateState;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> impl IntoResponse {
    Json(json!({
        "tenant_id": tenant.tenant_id().to_string(),
        "subject": principal.subject().to_string(),
        "status": principal.status(),
        "must_change_password": principal.identity().must_change_password,
        "permissions": principal.permissions().sorted(),
    }))
}

/// Where the client should go right after login.
pub async fn landing(
    Extension(gate): Extension<GateState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let session = match gate.resolve_session(&headers).await {
        Ok(session) => session,
        Err(response) => return response,
    };
    let Some(identity) = session.identity() else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "authentication required");
    };

    let target = gate.engine.post_login_target(identity, query.callback());
    Json(json!({ "target": target })).into_response()
}

pub async fn tasks(Extension(tenant): Extension<TenantContext>) -> impl IntoResponse {
    Json(json!({
        "tenant_id": tenant.tenant_id().to_string(),
        "tasks": [],
    }))
}
