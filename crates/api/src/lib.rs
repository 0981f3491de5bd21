//! HTTP edge: the pre-request gatekeeper and a small demo surface behind it.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
