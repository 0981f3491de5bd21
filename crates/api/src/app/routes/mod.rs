use axum::{Router, routing::get};

pub mod pages;
pub mod system;

/// Every route sits behind the gatekeeper; tiers come from the route table.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/api/session", get(system::whoami))
        .route("/api/session/landing", get(system::landing))
        .route("/api/tasks", get(system::tasks))
        .route("/login", get(pages::login))
        .route("/", get(pages::page))
        .route("/about", get(pages::page))
        .route("/register", get(pages::page))
        .route("/forgot-password", get(pages::page))
        .route("/dashboard", get(pages::page))
        .route("/change-password", get(pages::page))
        .route("/forbidden", get(pages::page))
        .route("/roles", get(pages::page))
        .route("/roles/*rest", get(pages::page))
        .route("/users", get(pages::page))
        .route("/tasks", get(pages::page))
        .route("/curricula", get(pages::page))
        .route("/expenses", get(pages::page))
        .fallback(pages::not_found)
}
