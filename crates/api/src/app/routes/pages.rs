//! Placeholder pages; they only show that the gate let the request through.

use axum::{
    Json,
    extract::{Extension, Query},
    http::{StatusCode, Uri},
    response::IntoResponse,
};
use serde_json::json;

use crate::app::dto::CallbackQuery;
use crate::app::errors::json_error;
use crate::context::PrincipalContext;

pub async fn page(uri: Uri, principal: Option<Extension<PrincipalContext>>) -> impl IntoResponse {
    Json(json!({
        "page": uri.path(),
        "subject": principal.map(|Extension(p)| p.subject().to_string()),
    }))
}

/// Login form; the callback is carried through to the post-login landing call.
pub async fn login(Query(query): Query<CallbackQuery>) -> impl IntoResponse {
    Json(json!({
        "page": "/login",
        "callbackUrl": query.callback(),
    }))
}

pub async fn not_found(uri: Uri) -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not_found", format!("no page at {}", uri.path()))
}
